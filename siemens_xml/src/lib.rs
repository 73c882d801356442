use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::warn;
use mr_protocol::{MRImagingProtocol, ProtocolError};
use param_tools::registry::ParamRegistry;
use param_tools::value::RawValue;
use sequence::imaging::{ImagingSequence, SourceDescriptor};

// Decoder for the Siemens exam-export ("print protocol") XML family.
//
// The document nests one step per sequence; each step carries a header path
// whose last backslash component names the sequence, and Card blocks of
// ProtParameter elements with Label/ValueAndUnit children. Labels are vendor
// acronyms (TR, TE, FA, ...) resolved through the registry alias table.
//
// Export variants reorder blocks and drop optional elements, so everything
// below the document root is probed, not indexed. One broken step never
// aborts the build; only an unparseable document does.

#[derive(Error,Debug)]
pub enum XmlError {
    #[error("malformed protocol export: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("document contains no protocol steps")]
    EmptyProtocol,
}

pub fn from_xml(xml:&str, registry:&ParamRegistry) -> Result<MRImagingProtocol,XmlError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    // some export variants wrap SubStep elements in Step containers; taking
    // both would double-count, so fall back to Step only when no SubStep exists
    let mut steps:Vec<Node> = root.descendants()
        .filter(|n| n.has_tag_name("SubStep"))
        .collect();
    if steps.is_empty() {
        steps = root.descendants().filter(|n| n.has_tag_name("Step")).collect();
    }
    if steps.is_empty() {
        return Err(XmlError::EmptyProtocol)
    }

    let name = root.attribute("name").unwrap_or("SiemensProtocol");
    let mut protocol = MRImagingProtocol::new(name);

    for (index,step) in steps.iter().enumerate() {
        let seq = parse_step(step,index,registry);
        add_with_unique_name(&mut protocol,seq,index);
    }
    Ok(protocol)
}

fn parse_step(step:&Node, index:usize, registry:&ParamRegistry) -> ImagingSequence {
    let mut entries = Vec::<(String,RawValue)>::new();
    for pp in step.descendants().filter(|n| n.has_tag_name("ProtParameter")) {
        let label = child_text(&pp,"Label");
        let value = child_text(&pp,"ValueAndUnit").or_else(|| child_text(&pp,"Value"));
        match (label,value) {
            (Some(label),Some(value)) => {
                let (val,_unit) = utils::split_value_unit(&value);
                entries.push((label,RawValue::Text(val)));
            }
            _ => warn!(step = index, "parameter element missing label or value, skipped")
        }
    }
    if entries.is_empty() {
        warn!(step = index, "protocol step carries no readable parameters");
    }

    let source = SourceDescriptor::Header(format!("siemens export step {}",index));
    let seq = ImagingSequence::from_header(&entries,registry,source);

    match step_name(step) {
        Some(name) => seq.with_name(&name),
        // keep a derived name when the header block is unusable; fall back
        // to a positional placeholder as a last resort
        None if seq.is_unnamed() => {
            warn!(step = index, "protocol step has no usable name");
            seq.with_name(&format!("step_{}",index))
        }
        None => seq
    }
}

// the sequence name is the last component of HeaderProtPath,
// e.g. "\\USER\\head\\t1_mprage" -> "t1_mprage"
fn step_name(step:&Node) -> Option<String> {
    let path = step.descendants()
        .find(|n| n.has_tag_name("HeaderProtPath"))
        .and_then(|n| n.text())?;
    let name = path.trim()
        .rsplit(|c| c == '\\' || c == '/')
        .next()
        .unwrap_or("")
        .trim();
    match name.is_empty() {
        true => None,
        false => Some(name.to_string())
    }
}

fn child_text(node:&Node, tag:&str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

// an exported session may repeat a sequence; suffix repeats so the
// append-only protocol invariant holds
fn add_with_unique_name(protocol:&mut MRImagingProtocol, seq:ImagingSequence, index:usize) {
    let base = seq.name().to_string();
    let mut candidate = seq;
    let mut attempt = 1;
    loop {
        match protocol.add_sequence(candidate.clone()) {
            Ok(()) => return,
            Err(ProtocolError::DuplicateSequence(_)) => {
                attempt += 1;
                candidate = candidate.with_name(&format!("{}_{}",base,attempt));
            }
            Err(_) => {
                candidate = candidate.with_name(&format!("step_{}",index));
            }
        }
    }
}
