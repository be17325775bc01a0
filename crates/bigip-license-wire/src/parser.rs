//! Activation response parser.
//!
//! Responses use SOAP encoding: the interesting values sit in `multiRef`
//! elements told apart by their `xsi:type`. Lookup is by local name and by
//! substring of an attribute value, so namespace prefixes do not matter.

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::outcome::NegotiationOutcome;

const REFERENCE_ELEMENT: &str = "multiRef";

/// Normalized view of one response; absent and empty values are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub eula: Option<String>,
    pub license: Option<String>,
    pub state: Option<String>,
    pub fault_number: Option<i64>,
    pub fault_text: Option<String>,
}

impl ParsedResponse {
    pub fn outcome(&self) -> NegotiationOutcome {
        NegotiationOutcome::from(self)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Typed value pulled out of one reference element
enum ReferenceField {
    State(Option<String>),
    Fault {
        number: Option<i64>,
        text: Option<String>,
    },
}

type Extractor = fn(Node) -> ReferenceField;

/// Type discriminator (substring of an attribute value) → extractor
const REFERENCE_EXTRACTORS: [(&str, Extractor); 2] = [
    ("TransactionState", extract_state),
    ("LicensingFault", extract_fault),
];

pub struct ResponseParser;

impl ResponseParser {
    /// Parses raw response bytes into an outcome
    pub fn parse(raw: &[u8]) -> Result<NegotiationOutcome, ParseError> {
        Self::read(raw).map(|response| response.outcome())
    }

    /// Parses raw response bytes into the normalized record
    pub fn read(raw: &[u8]) -> Result<ParsedResponse, ParseError> {
        let text = std::str::from_utf8(raw).map_err(|e| ParseError::Malformed(e.to_string()))?;
        let document = Document::parse(text).map_err(|e| ParseError::Malformed(e.to_string()))?;
        let root = document.root_element();

        let mut response = ParsedResponse {
            eula: first_text(root, "eula"),
            license: first_text(root, "license"),
            ..ParsedResponse::default()
        };

        let mut matched = [false; REFERENCE_EXTRACTORS.len()];
        for element in root
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == REFERENCE_ELEMENT)
        {
            for (slot, (discriminator, extract)) in REFERENCE_EXTRACTORS.iter().enumerate() {
                if matched[slot] || !has_attribute_containing(element, discriminator) {
                    continue;
                }
                matched[slot] = true;
                match extract(element) {
                    ReferenceField::State(state) => response.state = state,
                    ReferenceField::Fault { number, text } => {
                        response.fault_number = number;
                        response.fault_text = text;
                    }
                }
            }
        }

        Ok(response)
    }
}

fn has_attribute_containing(element: Node, needle: &str) -> bool {
    element.attributes().any(|attr| attr.value().contains(needle))
}

/// Concatenated text children, `None` when empty
fn own_text(node: Node) -> Option<String> {
    let text: String = node
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_text(root: Node, local_name: &str) -> Option<String> {
    root.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
        .and_then(own_text)
}

fn child_element<'a, 'input>(parent: Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
}

fn is_nil(element: Node) -> bool {
    element
        .attributes()
        .any(|attr| attr.name() == "nil" && matches!(attr.value(), "true" | "1"))
}

fn extract_state(element: Node) -> ReferenceField {
    let state = own_text(element)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    ReferenceField::State(state)
}

fn extract_fault(element: Node) -> ReferenceField {
    let number = child_element(element, "faultNumber")
        .and_then(own_text)
        .and_then(|n| n.trim().parse::<i64>().ok());
    let text = child_element(element, "faultText")
        .filter(|node| !is_nil(*node))
        .and_then(own_text);
    ReferenceField::Fault { number, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STATE_ONLY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
                  xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soapenv:Body>
    <multiRef id="id1" xsi:type="ns3:TransactionState" xmlns:ns3="urn:com.f5.license.v5b.ActivationService">
      EMAIL_REQUIRED
    </multiRef>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_state_is_trimmed() {
        let parsed = ResponseParser::read(STATE_ONLY.as_bytes()).unwrap();
        assert_eq!(parsed.state.as_deref(), Some("EMAIL_REQUIRED"));
        assert_eq!(parsed.outcome(), NegotiationOutcome::EmailRequired);
    }

    #[test]
    fn test_missing_fields_are_null() {
        let parsed = ResponseParser::read(STATE_ONLY.as_bytes()).unwrap();
        assert_eq!(
            parsed.to_json(),
            json!({
                "eula": null,
                "license": null,
                "state": "EMAIL_REQUIRED",
                "fault_number": null,
                "fault_text": null
            })
        );
    }

    #[test]
    fn test_non_numeric_fault_number_is_absent() {
        let raw = r#"<Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <multiRef xsi:type="ns9:LicensingFault">
    <faultNumber>n/a</faultNumber>
    <faultText>Dossier is invalid</faultText>
  </multiRef>
</Envelope>"#;
        let parsed = ResponseParser::read(raw.as_bytes()).unwrap();
        assert_eq!(parsed.fault_number, None);
        assert_eq!(parsed.fault_text.as_deref(), Some("Dossier is invalid"));
    }

    #[test]
    fn test_first_matching_reference_wins() {
        let raw = r#"<Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <multiRef xsi:type="a:TransactionState">EULA_REQUIRED</multiRef>
  <multiRef xsi:type="b:TransactionState">LICENSE_RETURNED</multiRef>
</Envelope>"#;
        let parsed = ResponseParser::read(raw.as_bytes()).unwrap();
        assert_eq!(parsed.state.as_deref(), Some("EULA_REQUIRED"));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = ResponseParser::read(&[0x3c, 0x61, 0x3e, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }
}
