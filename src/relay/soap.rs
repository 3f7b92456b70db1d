//! SOAP 1.1 plumbing for the message relay web service.
//!
//! The service speaks rpc-style SOAP. Requests are assembled as plain
//! text; responses are parsed with roxmltree, taking the text of the
//! first `return` element as the call result.

use roxmltree::Document;

use crate::error::{Error, Result};

/// Build an rpc-style request envelope for `operation`. `None`
/// parameters are sent as explicit nils.
pub fn envelope(operation: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut body = String::new();
    for (name, value) in params {
        match value {
            Some(value) => {
                body.push_str(&format!(
                    "      <{name}>{}</{name}>\n",
                    escape_xml(value),
                    name = name
                ));
            }
            None => {
                body.push_str(&format!(
                    "      <{name} xsi:nil=\"true\"/>\n",
                    name = name
                ));
            }
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
         \x20 <SOAP-ENV:Body>\n\
         \x20   <{operation}>\n\
         {body}\
         \x20   </{operation}>\n\
         \x20 </SOAP-ENV:Body>\n\
         </SOAP-ENV:Envelope>\n",
        operation = operation,
        body = body
    )
}

/// Extract the text of the first `return` element of a response
/// envelope. An envelope without one is malformed.
pub fn extract_return(xml: &str) -> Result<String> {
    let doc = Document::parse(xml)?;
    doc.descendants()
        .find(|node| node.has_tag_name("return"))
        .map(|node| node.text().unwrap_or_default().to_string())
        .ok_or_else(|| {
            Error::MalformedResponse("response envelope has no return element".to_string())
        })
}

pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_parameters() {
        let xml = envelope("sendMsg", &[("body", Some("<b>1 & 2</b>"))]);
        assert!(xml.contains("<body>&lt;b&gt;1 &amp; 2&lt;/b&gt;</body>"));
        assert!(!xml.contains("<body><b>"));
    }

    #[test]
    fn nil_parameters_are_marked() {
        let xml = envelope("sendMsg", &[("senderIdentifier", None)]);
        assert!(xml.contains("<senderIdentifier xsi:nil=\"true\"/>"));
    }

    #[test]
    fn extracts_first_return_value() {
        let xml = r#"<?xml version="1.0"?>
            <SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
              <SOAP-ENV:Body>
                <ns1:sendMsgResponse xmlns:ns1="urn:relay">
                  <return>0</return>
                </ns1:sendMsgResponse>
              </SOAP-ENV:Body>
            </SOAP-ENV:Envelope>"#;
        assert_eq!(extract_return(xml).unwrap(), "0");
    }

    #[test]
    fn missing_return_is_malformed() {
        let xml = r#"<Envelope><Body/></Envelope>"#;
        assert!(matches!(
            extract_return(xml),
            Err(Error::MalformedResponse(_))
        ));
    }
}
