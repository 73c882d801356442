use serde::{Deserialize, Serialize};
use thiserror::Error;
use param_tools::registry::ParamRegistry;
use param_tools::value::RawValue;
use sequence::compare::{compare, ComplianceReport};
use sequence::imaging::ImagingSequence;

#[derive(Error,Debug,PartialEq)]
pub enum ProtocolError {
    #[error("no sequence named '{0}' in protocol")]
    NotFound(String),
    #[error("sequence '{0}' already exists in this protocol; double check or rename")]
    DuplicateSequence(String),
    #[error("sequence must be named before it can join a protocol")]
    UnnamedSequence,
}

// a named collection of imaging sequences for one scan session or reference
// template. lookup is by name only, insertion order is kept for reporting,
// and growth is append-only: a protocol is a session record, not an editable
// document
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct MRImagingProtocol {
    name:String,
    sequences:Vec<ImagingSequence>,
}

impl MRImagingProtocol {
    pub fn new(name:&str) -> Self {
        Self {
            name: name.to_string(),
            sequences: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // the documented usage pattern is to probe membership by catching
    // NotFound, so a miss is a condition, not a panic
    pub fn get(&self, name:&str) -> Result<&ImagingSequence,ProtocolError> {
        self.sequences.iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| ProtocolError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name:&str) -> bool {
        self.sequences.iter().any(|s| s.name() == name)
    }

    pub fn add_sequence(&mut self, seq:ImagingSequence) -> Result<(),ProtocolError> {
        if seq.is_unnamed() {
            return Err(ProtocolError::UnnamedSequence)
        }
        if self.contains(seq.name()) {
            return Err(ProtocolError::DuplicateSequence(seq.name().to_string()))
        }
        self.sequences.push(seq);
        Ok(())
    }

    pub fn add_sequence_from_dict(&mut self, name:&str, entries:&[(String,RawValue)], registry:&ParamRegistry) -> Result<(),ProtocolError> {
        self.add_sequence(ImagingSequence::from_dict(name,entries,registry))
    }

    pub fn sequence_names(&self) -> Vec<&str> {
        self.sequences.iter().map(|s| s.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item=&ImagingSequence> {
        self.sequences.iter()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    // checks every sequence of this protocol against the same-named sequence
    // of a reference protocol. sequences the reference does not define are
    // reported with no verdict so the caller can decide
    pub fn compliant_with(&self, reference:&MRImagingProtocol, registry:&ParamRegistry) -> Vec<(String,Option<ComplianceReport>)> {
        self.sequences.iter()
            .map(|s| {
                let report = reference.get(s.name()).ok()
                    .map(|r| compare(s,r,registry,&[]));
                (s.name().to_string(),report)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t1w_dict() -> Vec<(String,RawValue)> {
        vec![
            (String::from("MagneticFieldStrength"),RawValue::Number(3.0)),
            (String::from("ScanningSequence"),RawValue::Text(String::from("GR"))),
            (String::from("RepetitionTime"),RawValue::Number(2000.0)),
            (String::from("EchoTime"),RawValue::Number(2.9)),
            (String::from("FlipAngle"),RawValue::Number(9.0)),
            (String::from("SliceThickness"),RawValue::Number(1.0)),
        ]
    }

    #[test]
    fn starts_empty(){
        let p = MRImagingProtocol::new("session_01");
        assert!(p.is_empty());
        assert_eq!(p.name(),"session_01");
    }

    #[test]
    fn add_and_get(){
        let reg = ParamRegistry::default();
        let mut p = MRImagingProtocol::new("session_01");
        p.add_sequence_from_dict("t1w",&t1w_dict(),&reg).unwrap();
        assert_eq!(p.len(),1);
        let seq = p.get("t1w").unwrap();
        assert_eq!(seq.name(),"t1w");
    }

    #[test]
    fn duplicate_insertion_is_a_conflict(){
        let reg = ParamRegistry::default();
        let mut p = MRImagingProtocol::new("session_01");
        let seq1 = ImagingSequence::from_dict("t1w",&t1w_dict(),&reg);
        let mut d = t1w_dict();
        d.retain(|(k,_)| k != "FlipAngle");
        d.push((String::from("FlipAngle"),RawValue::Number(12.0)));
        let seq2 = ImagingSequence::from_dict("t1w",&d,&reg);

        p.add_sequence(seq1.clone()).unwrap();
        assert_eq!(p.add_sequence(seq2),Err(ProtocolError::DuplicateSequence(String::from("t1w"))));
        // the first insertion is untouched
        assert_eq!(p.len(),1);
        assert_eq!(*p.get("t1w").unwrap(),seq1);
    }

    #[test]
    fn lookup_miss_is_not_found(){
        let reg = ParamRegistry::default();
        let mut p = MRImagingProtocol::new("session_01");
        p.add_sequence_from_dict("t1w",&t1w_dict(),&reg).unwrap();
        assert_eq!(p.get("t2w"),Err(ProtocolError::NotFound(String::from("t2w"))));
    }

    #[test]
    fn unnamed_sequences_are_rejected(){
        let reg = ParamRegistry::default();
        let seq = ImagingSequence::from_header(&t1w_dict(),&reg,sequence::imaging::SourceDescriptor::Manual);
        assert!(seq.is_unnamed());
        let mut p = MRImagingProtocol::new("session_01");
        assert_eq!(p.add_sequence(seq),Err(ProtocolError::UnnamedSequence));
    }

    #[test]
    fn insertion_order_is_kept(){
        let reg = ParamRegistry::default();
        let mut p = MRImagingProtocol::new("session_01");
        for name in ["scout","t1w","t2w","dwi"] {
            p.add_sequence_from_dict(name,&t1w_dict(),&reg).unwrap();
        }
        assert_eq!(p.sequence_names(),vec!["scout","t1w","t2w","dwi"]);
    }

    #[test]
    fn json_round_trip_reconstructs_protocol(){
        let reg = ParamRegistry::default();
        let mut p = MRImagingProtocol::new("session_01");
        p.add_sequence_from_dict("t1w",&t1w_dict(),&reg).unwrap();
        p.add_sequence_from_dict("t2w",&t1w_dict(),&reg).unwrap();

        // the whole tree survives a generic plain-data serializer
        let json = serde_json::to_string_pretty(&p).unwrap();
        let back:MRImagingProtocol = serde_json::from_str(&json).unwrap();
        assert_eq!(p,back);
        for name in back.sequence_names() {
            let a = p.get(name).unwrap();
            let b = back.get(name).unwrap();
            assert!(a.compliant(b,&reg));
        }
    }

    #[test]
    fn reference_comparison(){
        let reg = ParamRegistry::default();
        let mut site = MRImagingProtocol::new("site");
        site.add_sequence_from_dict("t1w",&t1w_dict(),&reg).unwrap();
        let mut drifted = t1w_dict();
        drifted.retain(|(k,_)| k != "RepetitionTime");
        drifted.push((String::from("RepetitionTime"),RawValue::Number(2100.0)));
        site.add_sequence_from_dict("t2w",&drifted,&reg).unwrap();
        site.add_sequence_from_dict("localizer",&t1w_dict(),&reg).unwrap();

        let mut reference = MRImagingProtocol::new("reference");
        reference.add_sequence_from_dict("t1w",&t1w_dict(),&reg).unwrap();
        reference.add_sequence_from_dict("t2w",&t1w_dict(),&reg).unwrap();

        let results = site.compliant_with(&reference,&reg);
        assert_eq!(results.len(),3);
        assert!(results[0].1.as_ref().unwrap().compliant);
        assert!(!results[1].1.as_ref().unwrap().compliant);
        // localizer has no reference counterpart: no verdict
        assert!(results[2].1.is_none());
    }
}
