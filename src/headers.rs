use hyper::HeaderMap;
use hyper::header::{CONNECTION, HOST, HeaderName, TRAILER, TRANSFER_ENCODING};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Appends every value of every header in `src` to `dest`.
///
/// Values already in `dest` are kept; values under one key keep their order.
pub fn relay_headers(src: &HeaderMap, dest: &mut HeaderMap) {
    for key in src.keys() {
        for value in src.get_all(key) {
            dest.append(key.clone(), value.clone());
        }
    }
}

/// Removes client identity claims so they never reach the upstream.
pub fn strip_client_identity(headers: &mut HeaderMap) {
    headers.remove(&X_FORWARDED_FOR);
    headers.remove(&X_REAL_IP);
}

/// Removes the message framing headers the HTTP client writes itself for the
/// outbound hop. `Host` is derived from the target URI. Everything else,
/// `Proxy-Authorization`, `TE` and `Upgrade` included, is forwarded.
pub fn strip_framing_headers(headers: &mut HeaderMap) {
    headers.remove(HOST);
    headers.remove(CONNECTION);
    headers.remove(TRANSFER_ENCODING);
    headers.remove(TRAILER);
}
