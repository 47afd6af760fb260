//! Boundary to the protocol-verb handlers.
//!
//! The routing core never interprets a verb itself; it asks the provider for
//! a command and hands it to the transaction manager, which executes it at
//! most once. What CRCX, RQNT and the rest actually do lives behind this
//! seam.

use async_trait::async_trait;

use mgcp_messages::{MgcpVerb, ResponseCode};

/// What a command execution produced, converted by the transaction manager
/// into the transaction's response.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub code: u16,
    pub comment: String,
    pub parameters: Vec<(String, String)>,
}

impl CommandResult {
    /// Builds a bare result from a well-known code.
    pub fn from_code(code: ResponseCode) -> Self {
        CommandResult {
            code: code.code(),
            comment: code.comment().to_string(),
            parameters: Vec::new(),
        }
    }
}

impl From<ResponseCode> for CommandResult {
    fn from(code: ResponseCode) -> Self {
        CommandResult::from_code(code)
    }
}

/// The executable unit representing one protocol verb's action, bound to
/// exactly one transaction.
#[async_trait]
pub trait MgcpCommand: Send + Sync {
    /// Runs the command. Consumes it: a command executes at most once.
    async fn execute(self: Box<Self>) -> CommandResult;
}

/// Stateless factory producing a command for a request.
///
/// Must be a pure factory: no side effects beyond constructing the command.
pub trait MgcpCommandProvider: Send + Sync {
    fn provide(
        &self,
        verb: MgcpVerb,
        transaction_id: u32,
        parameters: &[(String, String)],
    ) -> Box<dyn MgcpCommand>;
}
