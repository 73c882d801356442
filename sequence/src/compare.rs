use serde::{Deserialize, Serialize};
use std::fmt;
use param_tools::registry::ParamRegistry;
use param_tools::value::ParamValue;
use crate::imaging::ImagingSequence;

// one parameter that failed its equivalence check. an absent value is
// reported as Unspecified, never silently skipped
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Mismatch {
    pub name:String,
    pub value_a:ParamValue,
    pub value_b:ParamValue,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}: {} vs {}",self.name,self.value_a,self.value_b)
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ComplianceReport {
    pub compliant:bool,
    pub mismatches:Vec<Mismatch>,
}

// parameter-by-parameter compliance over the registry's required set plus
// any explicit extras. mismatch order follows the evaluation subset's
// canonical order, independent of either sequence's internal layout
pub fn compare(a:&ImagingSequence, b:&ImagingSequence, registry:&ParamRegistry, extras:&[&str]) -> ComplianceReport {
    let mut mismatches = Vec::<Mismatch>::new();

    for name in registry.comparison_set(extras) {
        let pa = a.get(&name);
        let pb = b.get(&name);
        match (pa,pb) {
            (Some(x),Some(y)) => {
                if !x.compliant(y) {
                    mismatches.push(Mismatch {
                        name,
                        value_a: x.value.clone(),
                        value_b: y.value.clone(),
                    });
                }
            }
            (None,None) if !required_for_comparison(registry,&name) => {}
            (pa,pb) => {
                // absent on at least one side. parameters the registry marks
                // optional are skipped; everything else counts as a mismatch
                if required_for_comparison(registry,&name) {
                    mismatches.push(Mismatch {
                        name,
                        value_a: pa.map(|p| p.value.clone()).unwrap_or(ParamValue::Unspecified),
                        value_b: pb.map(|p| p.value.clone()).unwrap_or(ParamValue::Unspecified),
                    });
                }
            }
        }
    }

    ComplianceReport {
        compliant: mismatches.is_empty(),
        mismatches,
    }
}

// unrecognized extras carry no optional flag, so their absence is reported
fn required_for_comparison(registry:&ParamRegistry, name:&str) -> bool {
    match registry.resolve(name) {
        Some(spec) => spec.required,
        None => true
    }
}
