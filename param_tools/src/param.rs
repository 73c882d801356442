use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use crate::registry::ParamSpec;
use crate::rule::EquivalenceRule;
use crate::value::ParamValue;

// a single named acquisition setting. immutable once built; comparisons
// never mutate either side
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Parameter {
    pub name:String,
    pub value:ParamValue,
    pub units:Option<String>,
    pub acronym:Option<String>,
    pub rule:EquivalenceRule,
    pub recognized:bool,
}

impl Parameter {
    pub fn new(spec:&ParamSpec, value:ParamValue) -> Self {
        Self {
            name: spec.name.clone(),
            value,
            units: spec.units.clone(),
            acronym: Some(spec.acronym.clone()),
            rule: spec.rule.clone(),
            recognized: true,
        }
    }

    // fields the registry does not know are retained with raw-equality
    // semantics so they can still round-trip through storage
    pub fn unrecognized(name:&str, value:ParamValue) -> Self {
        Self {
            name: name.to_string(),
            value,
            units: None,
            acronym: None,
            rule: EquivalenceRule::Exact,
            recognized: false,
        }
    }

    pub fn compliant(&self, other:&Parameter) -> bool {
        if !self.value.is_specified() || !other.value.is_specified() {
            warn!(param = %self.name, "one of the values being compared is Unspecified");
            return false
        }
        if !self.recognized || !other.recognized {
            // no declared rule on at least one side: raw equality only
            return self.value == other.value
        }
        self.rule.equivalent(&self.value,&other.value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.acronym.as_deref().unwrap_or(&self.name);
        write!(f,"{}({})",name,self.value)
    }
}
