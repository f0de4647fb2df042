/// A deployed artifact, passed through unopened (§6). The engine never interprets `payload`; a
/// frontend (out of scope here) is responsible for producing and consuming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployBlob {
    pub id: String,
    pub hash: String,
    pub prev_hash: Option<String>,
    pub payload: Vec<u8>,
}

impl DeployBlob {
    pub fn new(id: impl Into<String>, hash: impl Into<String>, prev_hash: Option<String>, payload: Vec<u8>) -> Self {
        Self { id: id.into(), hash: hash.into(), prev_hash, payload }
    }
}
