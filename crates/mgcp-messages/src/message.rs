use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Whether a message was received from the network or is being sent to it.
///
/// A direction is attached to a message at the moment it is observed crossing
/// the channel; it is never stored with the message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageDirection {
    /// Received from the network.
    Incoming,
    /// Being sent to the network.
    Outgoing,
}

impl fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageDirection::Incoming => write!(f, "incoming"),
            MessageDirection::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// The MGCP verb set (RFC 3435, Section 2.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MgcpVerb {
    /// CreateConnection
    Crcx,
    /// ModifyConnection
    Mdcx,
    /// DeleteConnection
    Dlcx,
    /// NotificationRequest
    Rqnt,
    /// Notify
    Ntfy,
    /// AuditEndpoint
    Auep,
    /// AuditConnection
    Aucx,
    /// EndpointConfiguration
    Epcf,
    /// RestartInProgress
    Rsip,
}

impl MgcpVerb {
    /// Wire form of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            MgcpVerb::Crcx => "CRCX",
            MgcpVerb::Mdcx => "MDCX",
            MgcpVerb::Dlcx => "DLCX",
            MgcpVerb::Rqnt => "RQNT",
            MgcpVerb::Ntfy => "NTFY",
            MgcpVerb::Auep => "AUEP",
            MgcpVerb::Aucx => "AUCX",
            MgcpVerb::Epcf => "EPCF",
            MgcpVerb::Rsip => "RSIP",
        }
    }
}

impl fmt::Display for MgcpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a verb token on the wire is not part of the MGCP verb set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown MGCP verb: {0}")]
pub struct UnknownVerb(pub String);

impl FromStr for MgcpVerb {
    type Err = UnknownVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRCX" => Ok(MgcpVerb::Crcx),
            "MDCX" => Ok(MgcpVerb::Mdcx),
            "DLCX" => Ok(MgcpVerb::Dlcx),
            "RQNT" => Ok(MgcpVerb::Rqnt),
            "NTFY" => Ok(MgcpVerb::Ntfy),
            "AUEP" => Ok(MgcpVerb::Auep),
            "AUCX" => Ok(MgcpVerb::Aucx),
            "EPCF" => Ok(MgcpVerb::Epcf),
            "RSIP" => Ok(MgcpVerb::Rsip),
            _ => Err(UnknownVerb(s.to_string())),
        }
    }
}

/// Well-known MGCP response codes (RFC 3435, Section 2.4).
///
/// Only the codes this control plane produces or inspects are listed; verb
/// handlers are free to answer with any numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// 000 - response acknowledgement.
    Acknowledgement,
    /// 100 - the transaction is currently being executed; sent in place of
    /// re-executing a duplicate request.
    TransactionBeingExecuted,
    /// 200 - the requested transaction was executed normally.
    TransactionWasExecuted,
    /// 400 - the transaction could not be executed due to a transient error.
    TransientError,
    /// 500 - the endpoint is unknown.
    EndpointUnknown,
    /// 510 - a protocol error was detected.
    ProtocolError,
}

impl ResponseCode {
    /// Numeric code carried on the wire.
    pub fn code(&self) -> u16 {
        match self {
            ResponseCode::Acknowledgement => 0,
            ResponseCode::TransactionBeingExecuted => 100,
            ResponseCode::TransactionWasExecuted => 200,
            ResponseCode::TransientError => 400,
            ResponseCode::EndpointUnknown => 500,
            ResponseCode::ProtocolError => 510,
        }
    }

    /// Human-readable comment carried after the code.
    pub fn comment(&self) -> &'static str {
        match self {
            ResponseCode::Acknowledgement => "Response Acknowledgement",
            ResponseCode::TransactionBeingExecuted => "Transaction is currently being executed",
            ResponseCode::TransactionWasExecuted => "The transaction was executed normally",
            ResponseCode::TransientError => "Transient error",
            ResponseCode::EndpointUnknown => "Endpoint is unknown",
            ResponseCode::ProtocolError => "Protocol error was detected",
        }
    }

    /// Provisional codes (1xx) announce that a final response will follow.
    pub fn is_provisional(&self) -> bool {
        (100..200).contains(&self.code())
    }

    /// Successful completion (2xx).
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.code())
    }
}

/// An MGCP command request.
///
/// `transaction_id` correlates the request with its eventual response. It is
/// a 32-bit unsigned value unique per call-agent/endpoint pair for the
/// lifetime of the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MgcpRequest {
    pub verb: MgcpVerb,
    pub transaction_id: u32,
    /// Target endpoint name, e.g. `mobicents/ivr/1@127.0.0.1:2427`.
    pub endpoint: String,
    /// Parameter lines in wire order, as `(name, value)` pairs.
    pub parameters: Vec<(String, String)>,
}

impl MgcpRequest {
    /// Looks up the first parameter with the given name, case-insensitively.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An MGCP response, correlated to its request by `transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MgcpResponse {
    pub transaction_id: u32,
    pub code: u16,
    pub comment: String,
    pub parameters: Vec<(String, String)>,
}

impl MgcpResponse {
    /// Builds a bare response from a well-known code.
    pub fn from_code(transaction_id: u32, code: ResponseCode) -> Self {
        MgcpResponse {
            transaction_id,
            code: code.code(),
            comment: code.comment().to_string(),
            parameters: Vec::new(),
        }
    }
}

/// An MGCP message: either a command request or a response to one.
///
/// Messages are immutable after construction. Sender and recipient addresses
/// are deliberately not part of the message; they are carried alongside it
/// wherever it travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MgcpMessage {
    Request(MgcpRequest),
    Response(MgcpResponse),
}

impl MgcpMessage {
    /// The transaction id correlating request and response.
    pub fn transaction_id(&self) -> u32 {
        match self {
            MgcpMessage::Request(request) => request.transaction_id,
            MgcpMessage::Response(response) => response.transaction_id,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, MgcpMessage::Request(_))
    }
}

impl fmt::Display for MgcpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MgcpMessage::Request(request) => {
                write!(f, "{} tx={}", request.verb, request.transaction_id)
            }
            MgcpMessage::Response(response) => {
                write!(f, "{} tx={}", response.code, response.transaction_id)
            }
        }
    }
}
