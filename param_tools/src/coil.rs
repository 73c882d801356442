use regex::Regex;
use std::collections::BTreeSet;

// coil groups whose name marks a head coil. when both sides of a comparison
// carry head coils, only those groups matter: neck/spine add-ons that switch
// in and out between sessions do not change the acquisition
const HEAD_COILS:[&str;5] = ["HC","HEA","HEP","HHA","HHP"];

#[derive(Clone,Debug,PartialEq,Eq,PartialOrd,Ord)]
pub struct CoilGroup {
    pub name:String,
    pub elements:BTreeSet<u32>,
}

// parses a scanner string like "HC1-7;NC1,2" into named element sets.
// tokens without a trailing element list ("HEA", "15K") parse to a bare name
pub fn parse_elements(value:&str) -> Vec<CoilGroup> {
    value.split(';')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(parse_group)
        .collect()
}

fn parse_group(token:&str) -> CoilGroup {
    let re = Regex::new(r"^(?P<name>.*?)(?P<spans>[0-9]+(?:[,\-][0-9]+)*)$")
        .expect("bad coil pattern");
    match re.captures(token) {
        Some(cap) => CoilGroup {
            name: cap["name"].to_string(),
            elements: expand_spans(&cap["spans"]),
        },
        None => CoilGroup {
            name: token.to_string(),
            elements: BTreeSet::new(),
        }
    }
}

// "1,3-7" -> {1,3,4,5,6,7}
fn expand_spans(spans:&str) -> BTreeSet<u32> {
    let mut out = BTreeSet::new();
    for part in spans.split(',') {
        match part.split_once('-') {
            Some((lo,hi)) => {
                let lo:u32 = lo.parse().unwrap_or(0);
                let hi:u32 = hi.parse().unwrap_or(0);
                for e in lo..=hi {
                    out.insert(e);
                }
            }
            None => {
                if let Ok(e) = part.parse::<u32>() {
                    out.insert(e);
                }
            }
        }
    }
    out
}

pub fn elements_equivalent(a:&str, b:&str) -> bool {
    let ga = parse_elements(a);
    let gb = parse_elements(b);
    let ha = head_groups(&ga);
    let hb = head_groups(&gb);
    if !ha.is_empty() && !hb.is_empty() {
        sorted(ha) == sorted(hb)
    } else {
        sorted(ga) == sorted(gb)
    }
}

fn head_groups(groups:&[CoilGroup]) -> Vec<CoilGroup> {
    groups.iter()
        .filter(|g| {
            // connector prefixes like "C:HEA" still name a head coil
            let name = g.name.rsplit(':').next().unwrap_or(&g.name);
            HEAD_COILS.contains(&name)
        })
        .cloned()
        .collect()
}

fn sorted(mut groups:Vec<CoilGroup>) -> Vec<CoilGroup> {
    groups.sort();
    groups
}
