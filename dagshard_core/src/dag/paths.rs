use crate::{Cid, store::StoreFeatures};
use base64::Engine;

const PREFIX: &str = "dag/";

pub fn path_for_cid(cid: &Cid, features: &StoreFeatures) -> String {
    let raw = cid.to_bytes();
    let cid_str = if features.case_sensitive {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_slice())
    } else {
        let mut output = Vec::with_capacity(base32_fs::encoded_len(raw.len()));
        base32_fs::encode(raw.as_slice(), &mut output);
        // base32-fs only emits ascii
        String::from_utf8_lossy(&output).into_owned()
    };

    // The leading bytes are version/codec/hash tags shared by most objects,
    // so segment on the tail of the encoding where the digest varies.
    if features.recommended_max_dir_size < 10000 {
        let split = cid_str.len().saturating_sub(4);
        let (head, tail) = cid_str.split_at(split);
        format!("{PREFIX}{}/{}/{}", &tail[0..2], &tail[2..4], head)
    } else {
        format!("{PREFIX}{cid_str}")
    }
}

pub fn cid_from_path(path: &str, features: &StoreFeatures) -> Result<Option<Cid>, std::io::Error> {
    let Some(rest) = path.strip_prefix(PREFIX) else {
        return Ok(None);
    };
    let segments: Vec<&str> = rest.split('/').collect();
    let encoded: String = match segments.as_slice() {
        [single] => (*single).to_string(),
        [a, b, head] => format!("{head}{a}{b}"),
        _ => return Ok(None),
    };
    if encoded.is_empty() {
        return Ok(None);
    }

    let bytes = if features.case_sensitive {
        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
    } else {
        // Validate first to avoid panics in `decode`.
        if !base32_fs::is_valid(encoded.as_bytes()) {
            return Ok(None);
        }
        let len = match base32_fs::decoded_len(encoded.len()) {
            Some(len) => len,
            None => return Ok(None),
        };
        let mut out = Vec::with_capacity(len);
        let _ = base32_fs::decode(encoded.as_bytes(), &mut out);
        out
    };

    Ok(Cid::from_bytes(&bytes).ok())
}
