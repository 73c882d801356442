use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::rule::EquivalenceRule;
use crate::value::ValueKind;

// one entry of the canonical parameter catalog
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct ParamSpec {
    pub name:String,
    pub acronym:String,
    pub kind:ValueKind,
    pub units:Option<String>,
    pub rule:EquivalenceRule,
    // required parameters are always part of the comparison set; their
    // absence from either side counts as a mismatch, never a silent pass
    pub required:bool,
}

// the catalog of recognized acquisition parameters with vendor aliasing.
// built once, read-only afterwards
pub struct ParamRegistry {
    specs:Vec<ParamSpec>,
    lookup:HashMap<String,usize>,
    identifiers:Vec<String>,
}

impl Default for ParamRegistry {
    fn default() -> Self {
        let mut reg = ParamRegistry {
            specs: Vec::new(),
            lookup: HashMap::new(),
            identifiers: vec![String::from("ProtocolName"),String::from("SequenceName")],
        };

        // hardware
        reg.insert(spec("Manufacturer","MFR",ValueKind::Text,None,EquivalenceRule::Exact,false),
                   &["0008,0070"]);
        reg.insert(spec("ManufacturersModelName","MMN",ValueKind::Text,None,EquivalenceRule::Exact,false),
                   &["ManufacturerModelName","0008,1090"]);
        reg.insert(spec("SoftwareVersions","SV",ValueKind::Text,None,EquivalenceRule::Exact,false),
                   &["SoftwareVersion","0018,1020"]);
        reg.insert(spec("MagneticFieldStrength","MFS",ValueKind::Number,Some("T"),EquivalenceRule::Tolerance(0.1),true),
                   &["FieldStrength","0018,0087"]);
        reg.insert(spec("ReceiveCoilName","RCN",ValueKind::Text,None,EquivalenceRule::Exact,false),
                   &["CoilName","0018,1250"]);
        reg.insert(spec("ReceiveCoilActiveElements","RCAE",ValueKind::Text,None,EquivalenceRule::CoilElements,false),
                   &["CoilString","0051,100f"]);

        // sequence specifics
        reg.insert(spec("ScanningSequence","SSEQ",ValueKind::Symbol,None,EquivalenceRule::Exact,true),
                   &["0018,0020"]);
        reg.insert(spec("SequenceVariant","SEQV",ValueKind::Symbol,None,EquivalenceRule::Exact,false),
                   &["0018,0021"]);
        reg.insert(spec("ScanOptions","SCOP",ValueKind::Symbol,None,EquivalenceRule::Exact,false),
                   &["0018,0022"]);
        reg.insert(spec("SequenceName","SQNM",ValueKind::Text,None,EquivalenceRule::Exact,false),
                   &["0018,0024"]);
        reg.insert(spec("ProtocolName","PRN",ValueKind::Text,None,EquivalenceRule::Exact,false),
                   &["0018,1030"]);
        reg.insert(spec("MRAcquisitionType","MRAT",ValueKind::Symbol,None,EquivalenceRule::Exact,false),
                   &["AcquisitionType","0018,0023"]);

        // in-plane spatial encoding
        reg.insert(spec("PhaseEncodingDirection","PED",ValueKind::Symbol,None,
                        EquivalenceRule::AxisCodes(classes(&[&["ROW","i"],&["COL","j"]])),false),
                   &["InPlanePhaseEncodingDirection","InPlanePhaseEncodingDirectionDICOM","0018,1312"]);
        reg.insert(spec("ParallelAcquisitionTechnique","PAT",ValueKind::Symbol,None,
                        EquivalenceRule::ValueClasses(classes(&[&["GRAPPA","PAT GRAPPA","IPAT"],&["SENSE","MSENSE"]])),false),
                   &["PATMode","0018,9078"]);
        reg.insert(spec("ParallelReductionFactorInPlane","PRFIP",ValueKind::Number,None,EquivalenceRule::Tolerance(0.0),false),
                   &["0018,9069"]);
        reg.insert(spec("PartialFourier","PF",ValueKind::Symbol,None,EquivalenceRule::Exact,false),
                   &["0018,9081"]);
        reg.insert(spec("PhaseEncodingSteps","PES",ValueKind::Number,None,EquivalenceRule::Tolerance(0.0),false),
                   &["NumberOfPhaseEncodingSteps","0018,0089"]);
        reg.insert(spec("PercentPhaseFOV","PPFOV",ValueKind::Number,Some("%"),EquivalenceRule::Tolerance(0.01),false),
                   &["PercentPhaseFieldOfView","0018,0094"]);

        // timing
        reg.insert(spec("RepetitionTime","TR",ValueKind::Number,Some("ms"),EquivalenceRule::Tolerance(0.001),true),
                   &["0018,0080"]);
        reg.insert(spec("EchoTime","TE",ValueKind::Number,Some("ms"),EquivalenceRule::Tolerance(0.001),true),
                   &["0018,0081"]);
        reg.insert(spec("InversionTime","TI",ValueKind::Number,Some("ms"),EquivalenceRule::Tolerance(0.001),false),
                   &["0018,0082"]);
        reg.insert(spec("EffectiveEchoSpacing","EES",ValueKind::Number,Some("s"),EquivalenceRule::Tolerance(1e-6),false),
                   &["0043,102c"]);

        // rf & contrast
        reg.insert(spec("FlipAngle","FA",ValueKind::Number,Some("degrees"),EquivalenceRule::Tolerance(0.0),true),
                   &["0018,1314"]);

        // slice geometry
        reg.insert(spec("SliceThickness","ST",ValueKind::Number,Some("mm"),EquivalenceRule::Tolerance(0.01),true),
                   &["0018,0050"]);
        reg.insert(spec("SpacingBetweenSlices","SBS",ValueKind::Number,Some("mm"),EquivalenceRule::Tolerance(0.01),false),
                   &["0018,0088"]);
        reg.insert(spec("SliceLocation","SL",ValueKind::Number,Some("mm"),EquivalenceRule::Tolerance(0.01),false),
                   &["0020,1041"]);

        // misc acquisition
        reg.insert(spec("EchoTrainLength","ETL",ValueKind::Number,None,EquivalenceRule::Tolerance(0.0),false),
                   &["0018,0091"]);
        reg.insert(spec("PixelBandwidth","PBW",ValueKind::Number,Some("Hz/px"),EquivalenceRule::Tolerance(0.5),false),
                   &["0018,0095"]);
        reg.insert(spec("NumberOfAverages","NAV",ValueKind::Number,None,EquivalenceRule::Tolerance(0.0),false),
                   &["Averages","0018,0083"]);
        reg.insert(spec("MultibandAccelerationFactor","MAF",ValueKind::Number,None,EquivalenceRule::Tolerance(0.0),false),
                   &["0043,1083"]);
        reg.insert(spec("BodyPartExamined","BPE",ValueKind::Text,None,EquivalenceRule::Exact,false),
                   &["0018,0015"]);
        reg.insert(spec("PixelSpacing","PS",ValueKind::NumVec,Some("mm"),EquivalenceRule::Tolerance(0.001),false),
                   &["0028,0030"]);
        reg.insert(spec("AcquisitionMatrix","ACQM",ValueKind::NumVec,None,EquivalenceRule::Tolerance(0.0),false),
                   &["MatrixSize","0018,1310"]);
        reg.insert(spec("ImageOrientationPatient","IOP",ValueKind::NumVec,None,EquivalenceRule::Tolerance(0.001),false),
                   &["0020,0037"]);
        reg.insert(spec("ShimMode","SHM",ValueKind::Symbol,None,
                        EquivalenceRule::ValueClasses(classes(&[&["TUNE_UP","TUNEUP"],&["STANDARD"],&["ADVANCED"]])),false),
                   &[]);

        reg
    }
}

impl ParamRegistry {
    // build over the base catalog with domain-supplied overrides applied
    pub fn with_config(cfg:&RegistryConfig) -> Result<Self,ConfigError> {
        let mut reg = ParamRegistry::default();
        for o in &cfg.overrides {
            let idx = match reg.resolve_index(&o.name) {
                Some(i) => i,
                None => return Err(ConfigError::UnknownParameter(o.name.clone()))
            };
            let s = &mut reg.specs[idx];
            if let Some(tol) = o.tolerance {
                s.rule = EquivalenceRule::Tolerance(tol);
            }
            if let Some(c) = &o.classes {
                s.rule = match s.rule {
                    EquivalenceRule::AxisCodes(_) => EquivalenceRule::AxisCodes(c.clone()),
                    _ => EquivalenceRule::ValueClasses(c.clone())
                };
            }
            if let Some(req) = o.required {
                s.required = req;
            }
        }
        Ok(reg)
    }

    fn insert(&mut self, spec:ParamSpec, aliases:&[&str]) {
        let idx = self.specs.len();
        self.lookup.insert(utils::normalize_key(&spec.name),idx);
        self.lookup.insert(utils::normalize_key(&spec.acronym),idx);
        for a in aliases {
            self.lookup.insert(utils::normalize_key(a),idx);
        }
        self.specs.push(spec);
    }

    fn resolve_index(&self, raw:&str) -> Option<usize> {
        self.lookup.get(&utils::normalize_key(raw)).copied()
    }

    // canonical lookup with case/whitespace-normalized, many-to-one aliasing.
    // unknown names are unrecognized, never an error
    pub fn resolve(&self, raw:&str) -> Option<&ParamSpec> {
        self.resolve_index(raw).map(|i| &self.specs[i])
    }

    pub fn is_required(&self, name:&str) -> bool {
        self.resolve(name).map(|s| s.required).unwrap_or(false)
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.specs.iter().filter(|s| s.required).map(|s| s.name.as_str()).collect()
    }

    // the evaluation subset for a comparison: required set in catalog order,
    // then any explicit extras in the order given. stable and deterministic
    pub fn comparison_set(&self, extras:&[&str]) -> Vec<String> {
        let mut names:Vec<String> = self.required_names().iter().map(|n| n.to_string()).collect();
        for e in extras {
            let canonical = match self.resolve(e) {
                Some(s) => s.name.clone(),
                None => e.to_string()
            };
            if !names.contains(&canonical) {
                names.push(canonical);
            }
        }
        names
    }

    // parameters that identify a sequence when no name is supplied,
    // in priority order
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn spec(name:&str, acronym:&str, kind:ValueKind, units:Option<&str>, rule:EquivalenceRule, required:bool) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        acronym: acronym.to_string(),
        kind,
        units: units.map(|u| u.to_string()),
        rule,
        required,
    }
}

fn classes(groups:&[&[&str]]) -> Vec<Vec<String>> {
    groups.iter().map(|g| g.iter().map(|m| m.to_string()).collect()).collect()
}

// per-site tolerance and equivalence tables are domain configuration,
// not something this crate can infer. they load once at startup
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct RegistryConfig {
    pub overrides:Vec<ParamOverride>,
}

#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct ParamOverride {
    pub name:String,
    pub tolerance:Option<f64>,
    pub required:Option<bool>,
    pub classes:Option<Vec<Vec<String>>>,
}

#[derive(Error,Debug)]
pub enum ConfigError {
    #[error("cannot read registry config {path:?}")]
    Io { path:PathBuf, source:std::io::Error },
    #[error("registry config is corrupt: {0}")]
    Corrupt(#[from] toml::de::Error),
    #[error("registry config cannot be encoded: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("override names unknown parameter '{0}'")]
    UnknownParameter(String),
}

impl RegistryConfig {
    pub fn from_file(filename:&Path) -> Result<Self,ConfigError> {
        let p = filename.with_extension(Self::file_ext());
        let t = std::fs::read_to_string(&p)
            .map_err(|source| ConfigError::Io { path:p.clone(), source })?;
        Ok(toml::from_str(&t)?)
    }

    pub fn to_file(&self, filename:&Path) -> Result<(),ConfigError> {
        let p = filename.with_extension(Self::file_ext());
        let t = toml::to_string_pretty(&self)?;
        std::fs::write(&p,t).map_err(|source| ConfigError::Io { path:p, source })?;
        Ok(())
    }

    pub fn file_ext() -> String {
        String::from("registry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical(){
        let reg = ParamRegistry::default();
        for raw in ["RepetitionTime","repetition_time"," Repetition Time ","TR","tr","0018,0080"] {
            let s = reg.resolve(raw).expect(raw);
            assert_eq!(s.name,"RepetitionTime");
        }
        assert_eq!(reg.resolve("ManufacturerModelName").unwrap().name,"ManufacturersModelName");
        assert_eq!(reg.resolve("InPlanePhaseEncodingDirection").unwrap().name,"PhaseEncodingDirection");
    }

    #[test]
    fn unknown_names_are_unrecognized(){
        let reg = ParamRegistry::default();
        assert!(reg.resolve("VendorSpecificBlob123").is_none());
    }

    #[test]
    fn required_subset(){
        let reg = ParamRegistry::default();
        assert!(reg.is_required("RepetitionTime"));
        assert!(reg.is_required("te"));
        assert!(!reg.is_required("SoftwareVersions"));
        assert!(!reg.is_required("NoSuchParameter"));
    }

    #[test]
    fn comparison_set_is_stable(){
        let reg = ParamRegistry::default();
        let a = reg.comparison_set(&["PED","SoftwareVersions"]);
        let b = reg.comparison_set(&["PED","SoftwareVersions"]);
        assert_eq!(a,b);
        // extras follow the required set and resolve to canonical names
        assert_eq!(a.last().unwrap(),"SoftwareVersions");
        assert!(a.contains(&String::from("PhaseEncodingDirection")));
        // a required name passed as an extra is not duplicated
        let c = reg.comparison_set(&["TR"]);
        assert_eq!(c.iter().filter(|n| n.as_str() == "RepetitionTime").count(),1);
    }

    #[test]
    fn config_overrides_apply(){
        let cfg = RegistryConfig {
            overrides: vec![ParamOverride {
                name: String::from("FlipAngle"),
                tolerance: Some(5.0),
                required: None,
                classes: None,
            }],
        };
        let reg = ParamRegistry::with_config(&cfg).unwrap();
        assert_eq!(reg.resolve("FlipAngle").unwrap().rule,EquivalenceRule::Tolerance(5.0));

        let bad = RegistryConfig {
            overrides: vec![ParamOverride {
                name: String::from("NoSuchParameter"),
                tolerance: Some(1.0),
                required: None,
                classes: None,
            }],
        };
        assert!(matches!(ParamRegistry::with_config(&bad),Err(ConfigError::UnknownParameter(_))));
    }

    #[test]
    fn config_file_round_trip(){
        let cfg = RegistryConfig {
            overrides: vec![ParamOverride {
                name: String::from("RepetitionTime"),
                tolerance: Some(0.01),
                required: Some(true),
                classes: None,
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("site_overrides");
        cfg.to_file(&base).unwrap();
        let loaded = RegistryConfig::from_file(&base).unwrap();
        assert_eq!(loaded.overrides.len(),1);
        assert_eq!(loaded.overrides[0].name,"RepetitionTime");
        assert_eq!(loaded.overrides[0].tolerance,Some(0.01));
    }
}
