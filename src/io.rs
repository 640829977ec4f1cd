//! Net descriptions on disk: JSON and PNML.
//!
//! The JSON form:
//!
//! ```json
//! {
//!   "places": [{ "id": "p1", "name": "idle", "tokens": 1 }],
//!   "transitions": [{ "id": "t1" }],
//!   "arcs": [{ "source": "p1", "target": "t1" }]
//! }
//! ```
//!
//! `name`, `tokens` and `weight` are optional.
//!
//! PNML documents are read from the `<net>` element under the root, with or
//! without the 2003/2009 PNML namespaces. Places, transitions and arcs may sit
//! directly in the net or inside `<page>` elements. Initial markings and arc
//! weights come from `initialMarking/text` and `inscription/text`.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::NetError;
use crate::net::{Net, NetBuilder};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("xml error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("invalid pnml: {0}")]
    Pnml(String),
    #[error("invalid net: {0}")]
    Net(#[from] NetError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDescription {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescription {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDescription {
    pub source: String,
    pub target: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDescription {
    #[serde(default)]
    pub places: Vec<PlaceDescription>,
    #[serde(default)]
    pub transitions: Vec<TransitionDescription>,
    #[serde(default)]
    pub arcs: Vec<ArcDescription>,
}

impl NetDescription {
    /// Feed the description to a builder: places, then transitions, then arcs.
    pub fn to_builder(&self) -> Result<NetBuilder, NetError> {
        let mut builder = NetBuilder::new();
        for place in &self.places {
            builder.add_place(&place.id, place.name.as_deref(), place.tokens)?;
        }
        for transition in &self.transitions {
            builder.add_transition(&transition.id, transition.name.as_deref())?;
        }
        for arc in &self.arcs {
            builder.add_arc(&arc.source, &arc.target, arc.weight)?;
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<Net, NetError> {
        Ok(self.to_builder()?.finalize())
    }

    /// Description of a finalized net, with places and transitions in canonical order.
    pub fn from_net(net: &Net) -> Self {
        let name = |id: &str, name: &str| (id != name).then(|| name.to_string());
        Self {
            places: net
                .places()
                .iter()
                .map(|p| PlaceDescription {
                    id: p.id().to_string(),
                    name: name(p.id(), p.name()),
                    tokens: p.tokens() as u32,
                })
                .collect(),
            transitions: net
                .transitions()
                .iter()
                .map(|t| TransitionDescription {
                    id: t.id().to_string(),
                    name: name(t.id(), t.name()),
                })
                .collect(),
            arcs: net
                .arcs()
                .iter()
                .map(|a| ArcDescription {
                    source: a.source().to_string(),
                    target: a.target().to_string(),
                    weight: a.weight(),
                })
                .collect(),
        }
    }
}

pub fn from_json_str(s: &str) -> Result<Net, LoadError> {
    let description: NetDescription = serde_json::from_str(s)?;
    Ok(description.build()?)
}

pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Net, LoadError> {
    let file = File::open(path)?;
    let description: NetDescription = serde_json::from_reader(BufReader::new(file))?;
    Ok(description.build()?)
}

pub fn to_json_string(net: &Net) -> Result<String, LoadError> {
    Ok(serde_json::to_string_pretty(&NetDescription::from_net(net))?)
}

pub fn write_json<P: AsRef<Path>>(path: P, net: &Net) -> Result<(), LoadError> {
    let mut file = File::create(path)?;
    let content = to_json_string(net)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

const PNML_NAMESPACES: [&str; 2] = [
    "http://www.pnml.org/version-2009/grammar/pnml",
    "http://www.pnml.org/version-2003/grammar/pnml",
];

fn is_pnml_element(node: &roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node
            .tag_name()
            .namespace()
            .map_or(true, |ns| PNML_NAMESPACES.contains(&ns))
}

fn pnml_child<'a, 'input>(node: roxmltree::Node<'a, 'input>, name: &str) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|c| is_pnml_element(c, name))
}

// <name><text>...</text></name>
fn pnml_label<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    pnml_child(node, name)
        .and_then(|label| pnml_child(label, "text"))
        .and_then(|text| text.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn pnml_id(node: roxmltree::Node<'_, '_>) -> Result<String, LoadError> {
    match node.attribute("id") {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(LoadError::Pnml(format!(
            "<{}> element missing 'id' attribute",
            node.tag_name().name()
        ))),
    }
}

impl NetDescription {
    /// Description of the first `<net>` of a PNML document.
    pub fn from_pnml(doc: &roxmltree::Document<'_>) -> Result<Self, LoadError> {
        let net = pnml_child(doc.root_element(), "net")
            .ok_or_else(|| LoadError::Pnml("no <net> element found".to_string()))?;
        let elements = |name: &'static str| net.descendants().filter(move |n| is_pnml_element(n, name));

        let mut description = NetDescription::default();
        for node in elements("place") {
            let id = pnml_id(node)?;
            let tokens = match pnml_label(node, "initialMarking") {
                Some(text) => text
                    .parse::<u32>()
                    .map_err(|_| LoadError::Pnml(format!("invalid initial marking for place {}: {}", id, text)))?,
                None => 0,
            };
            description.places.push(PlaceDescription {
                name: pnml_label(node, "name").map(str::to_string),
                id,
                tokens,
            });
        }
        for node in elements("transition") {
            description.transitions.push(TransitionDescription {
                id: pnml_id(node)?,
                name: pnml_label(node, "name").map(str::to_string),
            });
        }
        for node in elements("arc") {
            let (Some(source), Some(target)) = (node.attribute("source"), node.attribute("target")) else {
                return Err(LoadError::Pnml(
                    "<arc> element missing 'source' or 'target' attribute".to_string(),
                ));
            };
            let weight = match pnml_label(node, "inscription") {
                Some(text) => text
                    .parse::<u32>()
                    .map_err(|_| LoadError::Pnml(format!("invalid arc weight {}: {}", source, text)))?,
                None => 1,
            };
            description.arcs.push(ArcDescription {
                source: source.to_string(),
                target: target.to_string(),
                weight,
            });
        }
        Ok(description)
    }
}

pub fn from_pnml_str(s: &str) -> Result<Net, LoadError> {
    let doc = roxmltree::Document::parse(s)?;
    Ok(NetDescription::from_pnml(&doc)?.build()?)
}

pub fn read_pnml<P: AsRef<Path>>(path: P) -> Result<Net, LoadError> {
    let content = std::fs::read_to_string(path)?;
    from_pnml_str(&content)
}

/// Load a net, picking the format from the file extension (`.pnml`/`.xml` or JSON otherwise).
pub fn read_net<P: AsRef<Path>>(path: P) -> Result<Net, LoadError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pnml") || ext.eq_ignore_ascii_case("xml") => read_pnml(path),
        _ => read_json(path),
    }
}
