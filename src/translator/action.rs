use super::name::Name;
use super::pack::{write_bytes, Pack};

/// `pushtx` action name on the EVM contract.
pub const PUSHTX: Name = Name::from_raw(12587803899030667264);

/// Authorization of an action (`actor@permission`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl Pack for PermissionLevel {
    fn pack(&self, out: &mut Vec<u8>) {
        self.actor.pack(out);
        self.permission.pack(out);
    }
}

/// A contract action with its already-serialized data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: Vec<u8>,
}

impl Pack for Action {
    fn pack(&self, out: &mut Vec<u8>) {
        self.account.pack(out);
        self.name.pack(out);
        self.authorization.pack(out);
        write_bytes(out, &self.data);
    }
}

/// Data of the `pushtx` action.
///
/// `min_inclusion_price` is a binary extension: it is only serialized when
/// dynamic-fee mode is active, so legacy contracts still accept the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTx {
    pub miner: Name,
    pub rlptx: Vec<u8>,
    pub min_inclusion_price: Option<u64>,
}

impl Pack for PushTx {
    fn pack(&self, out: &mut Vec<u8>) {
        self.miner.pack(out);
        write_bytes(out, &self.rlptx);
        if let Some(price) = self.min_inclusion_price {
            Some(price).pack(out);
        }
    }
}

impl PushTx {
    /// Wrap into a `pushtx` action on `contract`, authorized by `authorizer`.
    pub fn into_action(self, contract: Name, authorizer: PermissionLevel) -> Action {
        Action {
            account: contract,
            name: PUSHTX,
            authorization: vec![authorizer],
            data: self.packed(),
        }
    }
}
