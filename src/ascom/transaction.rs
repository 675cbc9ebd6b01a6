use super::Params;
use crate::macros::auto_increment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Clone, Copy)]
pub(crate) struct RequestTransaction {
    #[serde(rename = "ClientTransactionID")]
    pub(crate) client_transaction_id: u32,
    #[serde(rename = "ClientID")]
    pub(crate) client_id: u32,
}

impl RequestTransaction {
    pub(crate) fn new(client_id: u32) -> Self {
        Self {
            client_transaction_id: auto_increment!(),
            client_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestWithTransaction<'params> {
    #[serde(flatten)]
    pub(crate) transaction: RequestTransaction,
    #[serde(flatten)]
    pub(crate) params: &'params Params,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct ResponseTransaction {
    #[serde(rename = "ClientTransactionID")]
    #[serde(default)]
    pub(crate) client_transaction_id: Option<u32>,
    #[serde(rename = "ServerTransactionID")]
    #[serde(default)]
    pub(crate) server_transaction_id: Option<u32>,
}
