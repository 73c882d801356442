use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;
use param_tools::param::Parameter;
use param_tools::registry::ParamRegistry;
use param_tools::value::{ParamValue, RawValue};

// placeholder for sequences built from sources that carry no identifying
// field. callers must rename before inserting into a protocol
pub const UNNAMED:&str = "unnamed";

// opaque provenance of a sequence
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub enum SourceDescriptor {
    File(PathBuf),
    Header(String),
    Manual,
}

// the full set of acquisition parameters of one scan. parameter names are
// unique; the whole structure is immutable after construction, so instances
// can be shared freely across comparisons
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ImagingSequence {
    name:String,
    unnamed:bool,
    source:SourceDescriptor,
    params:BTreeMap<String,Parameter>,
}

impl ImagingSequence {
    // builds from a generic header mapping (any decoder's tag -> value list).
    // keys resolve through the registry; a malformed field never blocks the
    // rest of the sequence. the name derives from the registry's
    // sequence-identifying parameters when present
    pub fn from_header(entries:&[(String,RawValue)], registry:&ParamRegistry, source:SourceDescriptor) -> Self {
        let params = build_params(entries,registry);
        let (name,unnamed) = derive_name(&params,registry);
        Self { name, unnamed, source, params }
    }

    // builds from a plain dictionary with an explicit name. values run
    // through the same resolve/coerce pipeline as the header path
    pub fn from_dict(name:&str, entries:&[(String,RawValue)], registry:&ParamRegistry) -> Self {
        let params = build_params(entries,registry);
        Self {
            name: name.to_string(),
            unnamed: false,
            source: SourceDescriptor::Manual,
            params,
        }
    }

    // rebuilding is the only way to rename; existing instances stay valid
    pub fn with_name(mut self, name:&str) -> Self {
        self.name = name.to_string();
        self.unnamed = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unnamed(&self) -> bool {
        self.unnamed
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn get(&self, name:&str) -> Option<&Parameter> {
        self.params.get(name)
    }

    pub fn contains(&self, name:&str) -> bool {
        self.params.contains_key(name)
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> impl Iterator<Item=&Parameter> {
        self.params.values()
    }

    // more than one echo time means a multi-echo acquisition
    pub fn multi_echo(&self) -> bool {
        match self.get("EchoTime") {
            Some(p) => matches!(&p.value,ParamValue::NumVec(v) if v.len() > 1),
            None => false
        }
    }

    pub fn compliant(&self, other:&ImagingSequence, registry:&ParamRegistry) -> bool {
        crate::compare::compare(self,other,registry,&[]).compliant
    }
}

fn build_params(entries:&[(String,RawValue)], registry:&ParamRegistry) -> BTreeMap<String,Parameter> {
    let mut params = BTreeMap::<String,Parameter>::new();
    for (key,raw) in entries {
        let param = match registry.resolve(key) {
            Some(spec) => {
                let value = ParamValue::coerce(raw,spec.kind);
                if value.is_raw() {
                    warn!(param = %spec.name, "value failed coercion, retained raw");
                }
                Parameter::new(spec,value)
            }
            None => {
                warn!(param = %key, "unrecognized parameter retained");
                Parameter::unrecognized(key,ParamValue::from_raw(raw))
            }
        };
        if params.insert(param.name.clone(),param).is_some() {
            warn!(param = %key, "duplicate parameter, last value wins");
        }
    }
    params
}

fn derive_name(params:&BTreeMap<String,Parameter>, registry:&ParamRegistry) -> (String,bool) {
    for id in registry.identifiers() {
        if let Some(p) = params.get(id) {
            match &p.value {
                ParamValue::Text(s) | ParamValue::Symbol(s) if !s.is_empty() =>
                    return (s.clone(),false),
                _ => {}
            }
        }
    }
    (String::from(UNNAMED),true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ParamRegistry {
        ParamRegistry::default()
    }

    #[test]
    fn dict_construction(){
        let reg = registry();
        let seq = ImagingSequence::from_dict("t1w",&[
            (String::from("RepetitionTime"),RawValue::Number(2000.0)),
            (String::from("EchoTime"),RawValue::Number(10.0)),
            (String::from("FlipAngle"),RawValue::Number(90.0)),
        ],&reg);
        assert_eq!(seq.name(),"t1w");
        assert!(!seq.is_unnamed());
        assert_eq!(seq.len(),3);
        assert_eq!(seq.get("RepetitionTime").unwrap().value,ParamValue::Number(2000.0));
        assert_eq!(*seq.source(),SourceDescriptor::Manual);
    }

    #[test]
    fn header_name_derivation(){
        let reg = registry();
        let seq = ImagingSequence::from_header(&[
            (String::from("0018,1030"),RawValue::Text(String::from("t1_mprage"))),
            (String::from("tr"),RawValue::Text(String::from("2000"))),
        ],&reg,SourceDescriptor::Header(String::from("digest:abc")));
        assert_eq!(seq.name(),"t1_mprage");
        assert!(!seq.is_unnamed());
        assert_eq!(seq.get("RepetitionTime").unwrap().value,ParamValue::Number(2000.0));
    }

    #[test]
    fn missing_identifier_flags_unnamed(){
        let reg = registry();
        let seq = ImagingSequence::from_header(&[
            (String::from("EchoTime"),RawValue::Number(10.0)),
        ],&reg,SourceDescriptor::Manual);
        assert!(seq.is_unnamed());
        assert_eq!(seq.name(),UNNAMED);
        let named = seq.with_name("fse_3d");
        assert!(!named.is_unnamed());
        assert_eq!(named.name(),"fse_3d");
    }

    #[test]
    fn unrecognized_field_is_retained(){
        let reg = registry();
        let seq = ImagingSequence::from_dict("t1w",&[
            (String::from("RepetitionTime"),RawValue::Number(2000.0)),
            (String::from("VendorSpecificBlob123"),RawValue::Text(String::from("0x1f"))),
        ],&reg);
        assert_eq!(seq.len(),2);
        let blob = seq.get("VendorSpecificBlob123").unwrap();
        assert!(!blob.recognized);
    }

    #[test]
    fn coercion_failure_is_localized(){
        let reg = registry();
        let seq = ImagingSequence::from_dict("t1w",&[
            (String::from("RepetitionTime"),RawValue::Text(String::from("fast"))),
            (String::from("EchoTime"),RawValue::Number(10.0)),
        ],&reg);
        // the malformed field is kept raw, the rest of the sequence builds
        assert!(seq.get("RepetitionTime").unwrap().value.is_raw());
        assert_eq!(seq.get("EchoTime").unwrap().value,ParamValue::Number(10.0));
    }

    #[test]
    fn multi_echo_detection(){
        let reg = registry();
        let multi = ImagingSequence::from_dict("mgre",&[
            (String::from("EchoTime"),RawValue::NumVec(vec![5.0,10.0,15.0])),
        ],&reg);
        assert!(multi.multi_echo());
        let single = ImagingSequence::from_dict("t1w",&[
            (String::from("EchoTime"),RawValue::Number(10.0)),
        ],&reg);
        assert!(!single.multi_echo());
    }

    #[test]
    fn serde_round_trip(){
        let reg = registry();
        let seq = ImagingSequence::from_dict("t1w",&[
            (String::from("RepetitionTime"),RawValue::Number(2000.0)),
            (String::from("PhaseEncodingDirection"),RawValue::Text(String::from("ROW"))),
        ],&reg);
        let json = serde_json::to_string(&seq).unwrap();
        let back:ImagingSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(seq,back);
    }
}
