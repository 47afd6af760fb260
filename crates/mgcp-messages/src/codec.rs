//! Line-oriented wire form for MGCP messages.
//!
//! A command starts with `VERB transaction-id endpoint MGCP 1.0`; a response
//! starts with `code transaction-id comment`. Either is followed by zero or
//! more `name: value` parameter lines. An empty line ends the parameter
//! section; anything after it (a session description) is ignored here and
//! left to the layers that negotiate media.

use bytes::Bytes;
use thiserror::Error;

use crate::message::{MgcpMessage, MgcpRequest, MgcpResponse, UnknownVerb};

/// Protocol version appended to encoded request lines.
const PROTOCOL_VERSION: &str = "MGCP 1.0";

/// Failures decoding a datagram into an [`MgcpMessage`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("datagram is not valid UTF-8")]
    NotUtf8,

    #[error("empty message")]
    Empty,

    #[error(transparent)]
    UnknownVerb(#[from] UnknownVerb),

    #[error("missing transaction id")]
    MissingTransactionId,

    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),

    #[error("invalid response code: {0}")]
    InvalidResponseCode(String),

    #[error("missing endpoint name")]
    MissingEndpoint,

    #[error("malformed parameter line: {0}")]
    MalformedParameter(String),
}

/// Decodes one datagram into a message.
pub fn decode(data: &[u8]) -> Result<MgcpMessage, CodecError> {
    let text = std::str::from_utf8(data).map_err(|_| CodecError::NotUtf8)?;
    let mut lines = text.lines();

    let start_line = lines
        .find(|line| !line.trim().is_empty())
        .ok_or(CodecError::Empty)?;
    let mut tokens = start_line.split_whitespace();
    let first = tokens.next().ok_or(CodecError::Empty)?;

    // A response line starts with a numeric code; a command starts with a verb.
    let message = if first.bytes().all(|b| b.is_ascii_digit()) {
        let code = first
            .parse::<u16>()
            .map_err(|_| CodecError::InvalidResponseCode(first.to_string()))?;
        let transaction_id = parse_transaction_id(tokens.next())?;
        let comment = tokens.collect::<Vec<_>>().join(" ");
        MgcpMessage::Response(MgcpResponse {
            transaction_id,
            code,
            comment,
            parameters: parse_parameters(&mut lines)?,
        })
    } else {
        let verb = first.parse()?;
        let transaction_id = parse_transaction_id(tokens.next())?;
        let endpoint = tokens.next().ok_or(CodecError::MissingEndpoint)?.to_string();
        // Trailing version tokens ("MGCP 1.0") are not validated.
        MgcpMessage::Request(MgcpRequest {
            verb,
            transaction_id,
            endpoint,
            parameters: parse_parameters(&mut lines)?,
        })
    };

    Ok(message)
}

/// Encodes a message into its wire form.
pub fn encode(message: &MgcpMessage) -> Bytes {
    let mut out = String::new();
    match message {
        MgcpMessage::Request(request) => {
            out.push_str(&format!(
                "{} {} {} {}\n",
                request.verb, request.transaction_id, request.endpoint, PROTOCOL_VERSION
            ));
            push_parameters(&mut out, &request.parameters);
        }
        MgcpMessage::Response(response) => {
            out.push_str(&format!(
                "{} {} {}\n",
                response.code, response.transaction_id, response.comment
            ));
            push_parameters(&mut out, &response.parameters);
        }
    }
    Bytes::from(out)
}

fn parse_transaction_id(token: Option<&str>) -> Result<u32, CodecError> {
    let token = token.ok_or(CodecError::MissingTransactionId)?;
    token
        .parse::<u32>()
        .map_err(|_| CodecError::InvalidTransactionId(token.to_string()))
}

fn parse_parameters<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
) -> Result<Vec<(String, String)>, CodecError> {
    let mut parameters = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::MalformedParameter(line.to_string()))?;
        parameters.push((name.trim().to_string(), value.trim().to_string()));
    }
    Ok(parameters)
}

fn push_parameters(out: &mut String, parameters: &[(String, String)]) {
    for (name, value) in parameters {
        out.push_str(&format!("{}: {}\n", name, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MgcpVerb;

    #[test]
    fn decodes_command_with_parameters() {
        let wire = b"CRCX 1204 gateway/br/1@rgw.example.net MGCP 1.0\nC: A3C47F21456789F0\nL: p:10, a:PCMU\nM: sendrecv\n";
        let message = decode(wire).unwrap();
        match message {
            MgcpMessage::Request(request) => {
                assert_eq!(request.verb, MgcpVerb::Crcx);
                assert_eq!(request.transaction_id, 1204);
                assert_eq!(request.endpoint, "gateway/br/1@rgw.example.net");
                assert_eq!(request.parameter("C"), Some("A3C47F21456789F0"));
                assert_eq!(request.parameters.len(), 3);
            }
            MgcpMessage::Response(_) => panic!("expected a request"),
        }
    }

    #[test]
    fn decodes_response() {
        let message = decode(b"200 1204 The transaction was executed normally\n").unwrap();
        match message {
            MgcpMessage::Response(response) => {
                assert_eq!(response.code, 200);
                assert_eq!(response.transaction_id, 1204);
                assert_eq!(response.comment, "The transaction was executed normally");
            }
            MgcpMessage::Request(_) => panic!("expected a response"),
        }
    }

    #[test]
    fn session_description_after_blank_line_is_ignored() {
        let wire = b"200 44 OK\nI: FDE234C8\n\nv=0\no=- 25678 753849 IN IP4 128.96.41.1\n";
        let message = decode(wire).unwrap();
        match message {
            MgcpMessage::Response(response) => {
                assert_eq!(response.parameters, vec![("I".to_string(), "FDE234C8".to_string())]);
            }
            MgcpMessage::Request(_) => panic!("expected a response"),
        }
    }

    #[test]
    fn encoded_request_decodes_back() {
        let request = MgcpMessage::Request(MgcpRequest {
            verb: MgcpVerb::Rqnt,
            transaction_id: 55,
            endpoint: "gateway/br/2".to_string(),
            parameters: vec![("X".to_string(), "0123456789AC".to_string())],
        });
        let decoded = decode(&encode(&request)).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode(b""), Err(CodecError::Empty)));
        assert!(matches!(decode(b"   \n  \n"), Err(CodecError::Empty)));
        assert!(matches!(
            decode(b"HOLD 12 gateway/br/1"),
            Err(CodecError::UnknownVerb(_))
        ));
        assert!(matches!(
            decode(b"CRCX abc gateway/br/1"),
            Err(CodecError::InvalidTransactionId(_))
        ));
        assert!(matches!(decode(b"CRCX 12"), Err(CodecError::MissingEndpoint)));
        assert!(matches!(
            decode(b"CRCX 12 gateway/br/1 MGCP 1.0\nno-colon-here\n"),
            Err(CodecError::MalformedParameter(_))
        ));
        assert!(matches!(decode(&[0xFF, 0xFE]), Err(CodecError::NotUtf8)));
    }
}
