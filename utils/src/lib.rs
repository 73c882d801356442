use regex::Regex;

// vendor headers spell the same parameter many ways (RepetitionTime,
// repetition_time, "Repetition Time"). fold everything to one form for lookup
pub fn normalize_key(key:&str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

// free-text values compare case- and whitespace-insensitively
pub fn fold_text(text:&str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ").to_uppercase()
}

// parses strings like "0.9 0.9", "0.9x0.9", "[1, 0, 0]" or "256" into numbers.
// returns None if any token fails to parse
pub fn parse_num_vec(text:&str) -> Option<Vec<f64>> {
    let sep = Regex::new(r"[\s,;xX*\\/]+").expect("bad separator pattern");
    let trimmed = text.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.is_empty() {
        return None
    }
    let mut vals = Vec::<f64>::new();
    for tok in sep.split(trimmed) {
        if tok.is_empty() {
            continue
        }
        match tok.parse::<f64>() {
            Ok(v) => vals.push(v),
            Err(_) => return None
        }
    }
    match vals.is_empty() {
        true => None,
        false => Some(vals)
    }
}

// splits a scanner-export value like "2000.0 ms" into ("2000.0",Some("ms")).
// values without a trailing unit come back unchanged
pub fn split_value_unit(text:&str) -> (String,Option<String>) {
    let trimmed = text.trim();
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((head,tail)) if is_unit(tail) && !head.trim().is_empty() =>
            (head.trim().to_string(),Some(tail.to_string())),
        _ => (trimmed.to_string(),None)
    }
}

fn is_unit(token:&str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_alphabetic() || c == 'µ' || c == '%' || c == '/')
}

#[test]
fn key_normalization(){
    assert_eq!(normalize_key("RepetitionTime"),normalize_key("repetition_time"));
    assert_eq!(normalize_key(" Repetition Time "),normalize_key("RepetitionTime"));
    assert_ne!(normalize_key("EchoTime"),normalize_key("RepetitionTime"));
}

#[test]
fn text_folding(){
    assert_eq!(fold_text("  spin   echo "),fold_text("Spin Echo"));
    assert_ne!(fold_text("spin echo"),fold_text("gradient echo"));
}

#[test]
fn num_vec_parsing(){
    assert_eq!(parse_num_vec("2000"),Some(vec![2000.0]));
    assert_eq!(parse_num_vec("0.9x0.9"),Some(vec![0.9,0.9]));
    assert_eq!(parse_num_vec("[1, 0, 0]"),Some(vec![1.0,0.0,0.0]));
    assert_eq!(parse_num_vec("ROW"),None);
    assert_eq!(parse_num_vec(""),None);
}

#[test]
fn value_unit_splitting(){
    assert_eq!(split_value_unit("2000.0 ms"),(String::from("2000.0"),Some(String::from("ms"))));
    assert_eq!(split_value_unit("90 deg"),(String::from("90"),Some(String::from("deg"))));
    assert_eq!(split_value_unit("ROW"),(String::from("ROW"),None));
    assert_eq!(split_value_unit("0.9x0.9 mm"),(String::from("0.9x0.9"),Some(String::from("mm"))));
}
