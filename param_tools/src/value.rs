use serde::{Deserialize, Serialize};
use std::fmt;

// the value variant a recognized parameter is expected to carry
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum ValueKind {
    Number,
    Text,
    Symbol,
    NumVec,
}

// raw values as handed over by an external header decoder or a plain dict.
// the core never sees the decoder's own types, only this
#[derive(Clone,Debug,PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    NumVec(Vec<f64>),
}

impl RawValue {
    fn display(&self) -> String {
        match self {
            RawValue::Number(n) => format_num(*n),
            RawValue::Text(s) => s.clone(),
            RawValue::NumVec(v) => join_nums(v),
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Symbol(String),
    NumVec(Vec<f64>),
    // kept when coercion to the declared kind fails; never equal to anything
    // under a tolerance rule
    Raw(String),
    // the value was absent or encoded as none in the source. kept distinct so
    // downstream users never impute a default
    Unspecified,
}

impl ParamValue {
    // coerce a raw source value to the declared kind. failures fall back to
    // Raw rather than aborting sequence construction
    pub fn coerce(raw:&RawValue, kind:ValueKind) -> ParamValue {
        match kind {
            ValueKind::Number => match raw {
                RawValue::Number(n) => ParamValue::Number(*n),
                // a numeric parameter handed in as a vector is a multi-value
                // acquisition (variable echo times); keep the full vector
                RawValue::NumVec(v) if v.len() == 1 => ParamValue::Number(v[0]),
                RawValue::NumVec(v) if v.len() > 1 => ParamValue::NumVec(v.clone()),
                RawValue::Text(s) => match utils::parse_num_vec(s) {
                    Some(v) if v.len() == 1 => ParamValue::Number(v[0]),
                    Some(v) => ParamValue::NumVec(v),
                    None => ParamValue::Raw(s.clone()),
                },
                _ => ParamValue::Raw(raw.display()),
            },
            ValueKind::NumVec => match raw {
                RawValue::NumVec(v) if !v.is_empty() => ParamValue::NumVec(v.clone()),
                RawValue::Number(n) => ParamValue::NumVec(vec![*n]),
                RawValue::Text(s) => match utils::parse_num_vec(s) {
                    Some(v) => ParamValue::NumVec(v),
                    None => ParamValue::Raw(s.clone()),
                },
                _ => ParamValue::Raw(raw.display()),
            },
            ValueKind::Text => match raw {
                RawValue::Text(s) if !s.trim().is_empty() => ParamValue::Text(s.trim().to_string()),
                RawValue::Number(n) => ParamValue::Text(format_num(*n)),
                _ => ParamValue::Raw(raw.display()),
            },
            ValueKind::Symbol => match raw {
                RawValue::Text(s) if !s.trim().is_empty() => ParamValue::Symbol(utils::fold_text(s)),
                // categorical codes are sometimes numeric in vendor headers
                RawValue::Number(n) => ParamValue::Symbol(format_num(*n)),
                _ => ParamValue::Raw(raw.display()),
            },
        }
    }

    // untyped passthrough for fields the registry does not recognize
    pub fn from_raw(raw:&RawValue) -> ParamValue {
        match raw {
            RawValue::Number(n) => ParamValue::Number(*n),
            RawValue::Text(s) => ParamValue::Text(s.clone()),
            RawValue::NumVec(v) => ParamValue::NumVec(v.clone()),
        }
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self,ParamValue::Unspecified)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self,ParamValue::Raw(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f,"{}",format_num(*n)),
            ParamValue::Text(s) => write!(f,"{}",s),
            ParamValue::Symbol(s) => write!(f,"{}",s),
            ParamValue::NumVec(v) => write!(f,"{}",join_nums(v)),
            ParamValue::Raw(s) => write!(f,"{}",s),
            ParamValue::Unspecified => write!(f,"Unspecified"),
        }
    }
}

fn format_num(n:f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}",n as i64)
    } else {
        format!("{}",n)
    }
}

fn join_nums(v:&[f64]) -> String {
    v.iter().map(|n| format_num(*n)).collect::<Vec<String>>().join(" ")
}

#[test]
fn numeric_coercion(){
    assert_eq!(ParamValue::coerce(&RawValue::Number(2000.0),ValueKind::Number),ParamValue::Number(2000.0));
    assert_eq!(ParamValue::coerce(&RawValue::Text(String::from("2000")),ValueKind::Number),ParamValue::Number(2000.0));
    assert_eq!(ParamValue::coerce(&RawValue::NumVec(vec![90.0]),ValueKind::Number),ParamValue::Number(90.0));
    // malformed field is retained raw, never dropped
    assert_eq!(ParamValue::coerce(&RawValue::Text(String::from("ROW")),ValueKind::Number),ParamValue::Raw(String::from("ROW")));
}

#[test]
fn multi_value_numeric(){
    // variable echo times stay a vector under a Number kind
    let v = ParamValue::coerce(&RawValue::NumVec(vec![10.0,20.0,30.0]),ValueKind::Number);
    assert_eq!(v,ParamValue::NumVec(vec![10.0,20.0,30.0]));
}

#[test]
fn symbol_coercion(){
    assert_eq!(ParamValue::coerce(&RawValue::Text(String::from(" row ")),ValueKind::Symbol),ParamValue::Symbol(String::from("ROW")));
    assert_eq!(ParamValue::coerce(&RawValue::Number(2.0),ValueKind::Symbol),ParamValue::Symbol(String::from("2")));
}

#[test]
fn vector_coercion(){
    assert_eq!(ParamValue::coerce(&RawValue::Text(String::from("0.9x0.9")),ValueKind::NumVec),ParamValue::NumVec(vec![0.9,0.9]));
    assert_eq!(ParamValue::coerce(&RawValue::Text(String::from("n/a")),ValueKind::NumVec),ParamValue::Raw(String::from("n/a")));
}
