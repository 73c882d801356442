use serde::{Deserialize, Serialize};
use crate::coil;
use crate::value::ParamValue;

// the equivalence rule attached to a parameter kind. all rules are symmetric;
// none is guaranteed transitive across three or more sequences, so chained
// compliance is the caller's problem
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub enum EquivalenceRule {
    // identical after normalization (text folds case and whitespace)
    Exact,
    // |a - b| <= tolerance, elementwise for vectors. NaN never matches
    Tolerance(f64),
    // a declared finite set of interchangeable encodings, e.g. ROW ~ i
    AxisCodes(Vec<Vec<String>>),
    // fixed partition into functionally identical classes
    ValueClasses(Vec<Vec<String>>),
    // receive-coil active-element strings like "HC1-7;NC1,2"
    CoilElements,
}

impl EquivalenceRule {
    pub fn equivalent(&self, a:&ParamValue, b:&ParamValue) -> bool {
        match self {
            EquivalenceRule::Exact => exact_eq(a,b),
            EquivalenceRule::Tolerance(tol) => within_tolerance(a,b,*tol),
            EquivalenceRule::AxisCodes(classes) |
            EquivalenceRule::ValueClasses(classes) => match (text_of(a),text_of(b)) {
                (Some(x),Some(y)) => same_class(classes,&x,&y),
                _ => false
            },
            EquivalenceRule::CoilElements => match (text_of(a),text_of(b)) {
                (Some(x),Some(y)) => coil::elements_equivalent(&x,&y),
                _ => false
            },
        }
    }
}

// Raw and Unspecified carry no comparable text
fn text_of(v:&ParamValue) -> Option<String> {
    match v {
        ParamValue::Text(s) | ParamValue::Symbol(s) => Some(utils::fold_text(s)),
        _ => None
    }
}

fn exact_eq(a:&ParamValue, b:&ParamValue) -> bool {
    match (a,b) {
        (ParamValue::Number(x),ParamValue::Number(y)) => x == y,
        (ParamValue::NumVec(x),ParamValue::NumVec(y)) => x == y,
        _ => match (text_of(a),text_of(b)) {
            (Some(x),Some(y)) => x == y,
            _ => false
        }
    }
}

fn within_tolerance(a:&ParamValue, b:&ParamValue, tol:f64) -> bool {
    match (nums_of(a),nums_of(b)) {
        (Some(x),Some(y)) if x.len() == y.len() =>
            x.iter().zip(y.iter()).all(|(p,q)| (p - q).abs() <= tol),
        _ => false
    }
}

fn nums_of(v:&ParamValue) -> Option<Vec<f64>> {
    match v {
        ParamValue::Number(n) if !n.is_nan() => Some(vec![*n]),
        ParamValue::NumVec(nv) if nv.iter().all(|n| !n.is_nan()) => Some(nv.clone()),
        _ => None
    }
}

fn same_class(classes:&[Vec<String>], a:&str, b:&str) -> bool {
    if a == b {
        return true
    }
    classes.iter().any(|class| {
        let has = |v:&str| class.iter().any(|m| utils::fold_text(m) == v);
        has(a) && has(b)
    })
}
