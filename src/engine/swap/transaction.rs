// Sol TWAP Swap: Transaction Wire Format
// UnsignedTransaction, SignedTransaction, compile_legacy_transaction,
// decode/encode_compact_u16
//
// Wire layout (legacy and v0 share the prefix this module edits):
//   [num_signatures (compact-u16)] [signature slots (N×64)] [message]
//   message = [0x80|version]? [header: 3 bytes] [account keys (compact-u16 + N×32)]
//             [recent blockhash (32)] [instructions ...] [lookups (v0 only)]
//
// The signed bytes are the whole message, version prefix included.

use base64::Engine as _;
use log::info;

use crate::atoms::constants::{BLOCKHASH_LEN, PUBKEY_LEN, SIGNATURE_LEN};
use crate::atoms::error::{EngineError, EngineResult};

// ── Unsigned ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    bytes: Vec<u8>,
    num_signatures: usize,
    sigs_offset: usize,
    message_offset: usize,
    version: Option<u8>,
    keys_offset: usize,
    num_keys: usize,
    blockhash_offset: usize,
}

impl UnsignedTransaction {
    pub fn from_bytes(bytes: Vec<u8>) -> EngineResult<Self> {
        let (num_signatures, sig_header_len) = decode_compact_u16(&bytes)?;
        let num_signatures = num_signatures as usize;
        if num_signatures == 0 {
            return Err(EngineError::InvalidTransaction("transaction requires 0 signatures".into()));
        }

        let sigs_offset = sig_header_len;
        let message_offset = sigs_offset + num_signatures * SIGNATURE_LEN;
        let mut cursor = message_offset;
        ensure_len(&bytes, cursor + 1, "signature slots")?;

        let version = if bytes[cursor] & 0x80 != 0 {
            let v = bytes[cursor] & 0x7F;
            if v != 0 {
                return Err(EngineError::InvalidTransaction(format!("unsupported message version {}", v)));
            }
            cursor += 1;
            Some(v)
        } else {
            None
        };

        ensure_len(&bytes, cursor + 3, "message header")?;
        let required = bytes[cursor] as usize;
        if required != num_signatures {
            return Err(EngineError::InvalidTransaction(format!(
                "header requires {} signatures but {} slots are present",
                required, num_signatures
            )));
        }
        cursor += 3;

        ensure_len(&bytes, cursor + 1, "account key count")?;
        let (num_keys, n) = decode_compact_u16(&bytes[cursor..])?;
        let num_keys = num_keys as usize;
        cursor += n;
        if num_keys < num_signatures {
            return Err(EngineError::InvalidTransaction(format!(
                "{} account keys cannot cover {} signers",
                num_keys, num_signatures
            )));
        }

        let keys_offset = cursor;
        cursor += num_keys * PUBKEY_LEN;
        ensure_len(&bytes, cursor + BLOCKHASH_LEN, "account keys and blockhash")?;

        Ok(Self {
            bytes,
            num_signatures,
            sigs_offset,
            message_offset,
            version,
            keys_offset,
            num_keys,
            blockhash_offset: cursor,
        })
    }

    pub fn from_base64(encoded: &str) -> EngineResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| EngineError::InvalidTransaction(format!("invalid base64: {}", e)))?;
        Self::from_bytes(bytes)
    }

    /// `None` for legacy, `Some(0)` for v0.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn num_required_signatures(&self) -> usize {
        self.num_signatures
    }

    pub fn account_key(&self, index: usize) -> Option<[u8; PUBKEY_LEN]> {
        if index >= self.num_keys {
            return None;
        }
        let start = self.keys_offset + index * PUBKEY_LEN;
        let mut key = [0u8; PUBKEY_LEN];
        key.copy_from_slice(&self.bytes[start..start + PUBKEY_LEN]);
        Some(key)
    }

    /// Account 0.
    pub fn fee_payer(&self) -> [u8; PUBKEY_LEN] {
        let mut key = [0u8; PUBKEY_LEN];
        key.copy_from_slice(&self.bytes[self.keys_offset..self.keys_offset + PUBKEY_LEN]);
        key
    }

    pub fn recent_blockhash(&self) -> [u8; BLOCKHASH_LEN] {
        let mut hash = [0u8; BLOCKHASH_LEN];
        hash.copy_from_slice(&self.bytes[self.blockhash_offset..self.blockhash_offset + BLOCKHASH_LEN]);
        hash
    }

    /// The bytes a signer signs.
    pub fn message(&self) -> &[u8] {
        &self.bytes[self.message_offset..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Make `payer` account 0. A no-op when it already is; rejected when the
    /// key appears at any other index, since moving it would reorder accounts.
    pub fn set_fee_payer(&mut self, payer: &[u8; PUBKEY_LEN]) -> EngineResult<()> {
        if &self.fee_payer() == payer {
            return Ok(());
        }
        if let Some(idx) = (1..self.num_keys).find(|&i| self.account_key(i).as_ref() == Some(payer)) {
            return Err(EngineError::InvalidTransaction(format!(
                "fee payer already appears at account index {}",
                idx
            )));
        }
        self.bytes[self.keys_offset..self.keys_offset + PUBKEY_LEN].copy_from_slice(payer);
        self.clear_signatures();
        Ok(())
    }

    /// Overwrite the blockhash. Every existing signature is invalidated.
    pub fn set_recent_blockhash(&mut self, blockhash: &[u8; BLOCKHASH_LEN]) {
        self.bytes[self.blockhash_offset..self.blockhash_offset + BLOCKHASH_LEN].copy_from_slice(blockhash);
        self.clear_signatures();
    }

    fn clear_signatures(&mut self) {
        let end = self.message_offset;
        self.bytes[self.sigs_offset..end].fill(0);
    }

    /// Place `signature` in the slot of `signer`, which must be one of the
    /// required signers.
    pub fn apply_signature(
        mut self,
        signer: &[u8; PUBKEY_LEN],
        signature: [u8; SIGNATURE_LEN],
    ) -> EngineResult<SignedTransaction> {
        let slot = (0..self.num_signatures)
            .find(|&i| self.account_key(i).as_ref() == Some(signer))
            .ok_or_else(|| EngineError::Signing("signer is not a required signer of this transaction".into()))?;
        let start = self.sigs_offset + slot * SIGNATURE_LEN;
        self.bytes[start..start + SIGNATURE_LEN].copy_from_slice(&signature);
        info!(
            "[swap] Transaction signed (versioned={}, sigs={}, msg_len={})",
            self.version.is_some(),
            self.num_signatures,
            self.message().len()
        );
        SignedTransaction::from_bytes(self.bytes)
    }
}

fn ensure_len(bytes: &[u8], needed: usize, what: &str) -> EngineResult<()> {
    if bytes.len() < needed {
        return Err(EngineError::InvalidTransaction(format!(
            "transaction truncated in {}: need {} bytes, have {}",
            what,
            needed,
            bytes.len()
        )));
    }
    Ok(())
}

// ── Signed ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    bytes: Vec<u8>,
    signature: [u8; SIGNATURE_LEN],
}

impl SignedTransaction {
    /// Accept fully serialized bytes, e.g. from an external signer. The fee
    /// payer slot must carry a signature.
    pub fn from_bytes(bytes: Vec<u8>) -> EngineResult<Self> {
        let parsed = UnsignedTransaction::from_bytes(bytes)?;
        let start = parsed.sigs_offset;
        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&parsed.bytes[start..start + SIGNATURE_LEN]);
        if signature.iter().all(|b| *b == 0) {
            return Err(EngineError::Signing("fee payer signature slot is empty".into()));
        }
        Ok(Self { bytes: parsed.bytes, signature })
    }

    /// Base58 fee-payer signature, which is the network transaction id.
    pub fn signature(&self) -> String {
        bs58::encode(self.signature).into_string()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ── Compact-u16 ───────────────────────────────────────────────────────

/// Returns (value, bytes_consumed).
pub(crate) fn decode_compact_u16(data: &[u8]) -> EngineResult<(u16, usize)> {
    let mut value: u32 = 0;
    for (i, byte) in data.iter().take(3).enumerate() {
        value |= ((*byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| EngineError::InvalidTransaction("compact-u16 overflow".into()));
        }
    }
    Err(EngineError::InvalidTransaction("truncated compact-u16".into()))
}

pub(crate) fn encode_compact_u16(val: u16) -> Vec<u8> {
    if val < 0x80 {
        vec![val as u8]
    } else if val < 0x4000 {
        vec![(val & 0x7F | 0x80) as u8, (val >> 7) as u8]
    } else {
        vec![(val & 0x7F | 0x80) as u8, ((val >> 7) & 0x7F | 0x80) as u8, (val >> 14) as u8]
    }
}

// ── Legacy builder ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: [u8; PUBKEY_LEN],
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// Serialize a legacy transaction with zeroed signature slots. `accounts`
/// must already be ordered signers-first, writable-first within each group.
pub fn compile_legacy_transaction(
    recent_blockhash: &[u8; BLOCKHASH_LEN],
    accounts: &[AccountMeta],
    instructions: &[CompiledInstruction],
) -> Vec<u8> {
    let num_signers = accounts.iter().filter(|a| a.is_signer).count() as u8;
    let num_readonly_signed = accounts.iter().filter(|a| a.is_signer && !a.is_writable).count() as u8;
    let num_readonly_unsigned = accounts.iter().filter(|a| !a.is_signer && !a.is_writable).count() as u8;

    let mut message = vec![num_signers, num_readonly_signed, num_readonly_unsigned];
    message.extend_from_slice(&encode_compact_u16(accounts.len() as u16));
    for account in accounts {
        message.extend_from_slice(&account.pubkey);
    }
    message.extend_from_slice(recent_blockhash);

    message.extend_from_slice(&encode_compact_u16(instructions.len() as u16));
    for ix in instructions {
        message.push(ix.program_id_index);
        message.extend_from_slice(&encode_compact_u16(ix.accounts.len() as u16));
        message.extend_from_slice(&ix.accounts);
        message.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
        message.extend_from_slice(&ix.data);
    }

    let mut tx = encode_compact_u16(num_signers as u16);
    tx.resize(tx.len() + num_signers as usize * SIGNATURE_LEN, 0);
    tx.extend_from_slice(&message);
    tx
}
