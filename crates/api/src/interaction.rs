use crate::bot::Bot;
use ed25519_dalek::{Signature, Verifier};
use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Body, Bytes},
    header::{HeaderValue, CONTENT_TYPE},
    Method, Request, Response, StatusCode,
};

pub use ed25519_dalek::VerifyingKey;

/// Checks that the request is a Discord interaction signed by `public`. Yields the raw payload.
pub async fn validate_request<B>(req: Request<B>, public: &VerifyingKey) -> Result<Bytes, StatusCode>
where
    B: Body,
{
    // Disallow non-POST methods and unexpected paths
    if req.method() != Method::POST || req.uri().path() != "/" {
        return Err(StatusCode::NOT_FOUND);
    }

    // Retrieve security headers
    let (parts, body) = req.into_parts();
    let maybe_sig = parts.headers.get("X-Signature-Ed25519");
    let maybe_time = parts.headers.get("X-Signature-Timestamp");
    let (sig, timestamp) = maybe_sig.zip(maybe_time).ok_or(StatusCode::UNAUTHORIZED)?;
    let signature = hex::decode(sig).map_err(|_| StatusCode::BAD_REQUEST)?;
    let signature = Signature::from_slice(&signature).map_err(|_| StatusCode::BAD_REQUEST)?;

    // Append body after the timestamp
    let payload = body.collect().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?.to_bytes();
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(&payload);

    // Validate the challenge
    public.verify(&message, &signature).map_err(|_| StatusCode::UNAUTHORIZED)?;
    Ok(payload)
}

pub async fn try_respond<B>(
    req: Request<B>,
    public: &VerifyingKey,
    bot: &Bot,
) -> Result<Response<Full<Bytes>>, StatusCode>
where
    B: Body,
{
    let payload = validate_request(req, public).await?;

    // Parse incoming interaction
    let interaction = serde_json::from_slice(&payload).map_err(|_| StatusCode::BAD_REQUEST)?;
    drop(payload);

    // Construct new body
    let reply = bot.on_message(interaction).await;
    let bytes = serde_json::to_vec(&reply).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut res = Response::new(Full::new(Bytes::from(bytes)));
    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json")).is_none());
    Ok(res)
}

/// Like [`try_respond`], but renders failures as bare status codes.
pub async fn respond<B>(req: Request<B>, public: &VerifyingKey, bot: &Bot) -> Response<Full<Bytes>>
where
    B: Body,
{
    match try_respond(req, public, bot).await {
        Ok(res) => res,
        Err(code) => {
            log::warn!("rejected request: {code}");
            let mut res = Response::new(Full::default());
            *res.status_mut() = code;
            res
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    const PAYLOAD: &str = r#"{"type":1}"#;
    const TIMESTAMP: &str = "1700000000";

    fn signer() -> SigningKey {
        SigningKey::from_bytes(&[7; 32])
    }

    fn request(method: Method, path: &str, signature: Option<String>) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(path).header("X-Signature-Timestamp", TIMESTAMP);
        if let Some(signature) = signature {
            builder = builder.header("X-Signature-Ed25519", signature);
        }
        builder.body(Full::new(Bytes::from_static(PAYLOAD.as_bytes()))).unwrap()
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        hex::encode(key.sign(message.as_bytes()).to_bytes())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn accepts_signed_interactions() {
        let key = signer();
        let signature = sign(&key, &format!("{TIMESTAMP}{PAYLOAD}"));
        let payload = validate_request(request(Method::POST, "/", Some(signature)), &key.verifying_key()).await;
        assert_eq!(payload.unwrap(), PAYLOAD.as_bytes());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejects_unexpected_routes() {
        let key = signer();
        let signature = sign(&key, &format!("{TIMESTAMP}{PAYLOAD}"));
        let public = key.verifying_key();
        let res = validate_request(request(Method::GET, "/", Some(signature.clone())), &public).await;
        assert_eq!(res.unwrap_err(), StatusCode::NOT_FOUND);
        let res = validate_request(request(Method::POST, "/login", Some(signature)), &public).await;
        assert_eq!(res.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejects_missing_or_forged_signatures() {
        let key = signer();
        let public = key.verifying_key();
        let res = validate_request(request(Method::POST, "/", None), &public).await;
        assert_eq!(res.unwrap_err(), StatusCode::UNAUTHORIZED);

        let res = validate_request(request(Method::POST, "/", Some(String::from("zz"))), &public).await;
        assert_eq!(res.unwrap_err(), StatusCode::BAD_REQUEST);

        let forged = sign(&key, &format!("{TIMESTAMP}{{\"type\":2}}"));
        let res = validate_request(request(Method::POST, "/", Some(forged)), &public).await;
        assert_eq!(res.unwrap_err(), StatusCode::UNAUTHORIZED);

        let stranger = sign(&SigningKey::from_bytes(&[9; 32]), &format!("{TIMESTAMP}{PAYLOAD}"));
        let res = validate_request(request(Method::POST, "/", Some(stranger)), &public).await;
        assert_eq!(res.unwrap_err(), StatusCode::UNAUTHORIZED);
    }
}
