//! Variant Generation Stream
//!
//! One slide generation attempt is one WebSocket session:
//!
//! ```text
//!   connect ──▶ send request ──▶ accumulate messages ──▶ server closes
//!                                                              │
//!                                                              ▼
//!                                                      resolve_outcome()
//! ```
//!
//! The client never terminates the stream early. The server acknowledges the
//! request first, then pushes variants; the message at index 1 is the default
//! variant. The whole session runs under the configured stream timeout so a
//! stalled server cannot wedge a run.

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::config::EngineConfig;

use super::{GenerationError, GenerationRequest, Variant, VariantId, BROWSER_USER_AGENT};

/// Path of the generation endpoint, relative to the stream base
const STREAM_PATH: &str = "/ws/create-and-stream-slide-variants";

/// Layout directive sent with every generation request
const LAYOUT_TYPE: &str = "AI_GENERATED_LAYOUT";

/// Substring the server embeds when it rejects an uploaded image's MIME type
const IMAGE_REJECTION_MARKER: &str =
    "Input should be 'image/jpeg', 'image/png', 'image/gif' or 'image/webp'";

/// Slide authoring instructions sent verbatim with every request
const GENERATION_INSTRUCTIONS: &str = "
Make slides that are engaging and informative with minimal text. Follow these rules for every slide:

Title
– One short relevant title.

Content
– 4–5 bullet points, each ≤ 12 words.
– One idea per bullet.

Layout depends on image availability in images_on_slide:
– If With image: two‑column with text on left and image on right or vice-versa.
– If Without image: centered title + bullets.

If images_on_slide is empty, only then fallback to using text-only layout.
";

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Run one generation session and resolve its outcome
pub(crate) async fn run_generation(
    config: &EngineConfig,
    token: &str,
    request: &GenerationRequest,
) -> Result<Variant, GenerationError> {
    let url = format!("{}{STREAM_PATH}", config.provider.stream_base);
    let handshake = build_handshake(&url, &config.provider.origin)?;

    let session = tokio::time::timeout(config.stream_timeout, async {
        let (mut socket, _) = connect_async(handshake)
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let payload = generation_payload(token, request);
        socket
            .send(Message::Text(payload.to_string()))
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(drain_messages(&mut socket).await)
    })
    .await;

    let messages = match session {
        Ok(Ok(messages)) => messages,
        Ok(Err(error)) => return Err(error),
        Err(_) => return Err(GenerationError::TimedOut(config.stream_timeout)),
    };

    debug!(
        slide_id = %request.slide_id,
        received = messages.len(),
        "Generation stream closed"
    );
    resolve_outcome(&messages)
}

/// Handshake request with the headers the endpoint expects
///
/// The library supplies the `Sec-WebSocket-*` headers itself.
fn build_handshake(
    url: &str,
    origin: &str,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, GenerationError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| GenerationError::Transport(e.to_string()))?;

    let origin_value = HeaderValue::from_str(origin)
        .map_err(|e| GenerationError::Transport(format!("invalid origin header: {e}")))?;

    let headers = request.headers_mut();
    headers.insert("Origin", origin_value);
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Accept-Language", HeaderValue::from_static("en"));
    headers.insert("Pragma", HeaderValue::from_static("no-cache"));
    headers.insert("User-Agent", HeaderValue::from_static(BROWSER_USER_AGENT));

    Ok(request)
}

/// The generation request frame
fn generation_payload(token: &str, request: &GenerationRequest) -> serde_json::Value {
    json!({
        "auth_token": token,
        "presentation_id": request.presentation_id,
        "slide_id": request.slide_id,
        "slide_specific_context": request.context,
        "images_on_slide": request.images,
        "additional_instructions": GENERATION_INSTRUCTIONS,
        "layout_type": LAYOUT_TYPE,
        "update_tone_verbosity_calibration_status": false,
    })
}

/// Read text frames until the server closes the connection
///
/// A mid-stream read error ends the session with whatever arrived so far;
/// outcome classification decides what the partial transcript means.
async fn drain_messages(socket: &mut WsStream) -> Vec<String> {
    let mut messages = Vec::new();

    while let Some(frame) = socket.next().await {
        match frame {
            Ok(Message::Text(text)) => messages.push(text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(error = %error, "Generation stream ended abruptly");
                break;
            }
        }
    }

    messages
}

/// Classify a completed session's transcript
///
/// At least two messages mean success: the server acknowledges first, and the
/// message at index 1 is the default variant. Anything shorter is a failure,
/// further classified as an image rejection when the last message carries the
/// provider's MIME complaint.
///
/// # Errors
///
/// Returns the failure classification for this attempt.
pub fn resolve_outcome(messages: &[String]) -> Result<Variant, GenerationError> {
    if messages.len() < 2 {
        if let Some(last) = messages.last() {
            if last.contains(IMAGE_REJECTION_MARKER) {
                return Err(GenerationError::UnsupportedImage(snippet(last)));
            }
        }
        return Err(GenerationError::Underrun {
            received: messages.len(),
        });
    }

    let raw = &messages[1];
    if raw.contains(IMAGE_REJECTION_MARKER) {
        return Err(GenerationError::UnsupportedImage(snippet(raw)));
    }

    let payload: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| GenerationError::MalformedVariant(format!("not JSON: {e}")))?;

    let id = payload
        .get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| GenerationError::MalformedVariant("message has no variant id".to_string()))?
        .to_string();

    Ok(Variant {
        id: VariantId(id),
        payload,
    })
}

/// Cap provider error text for log and error messages
fn snippet(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.len() <= LIMIT {
        return text.to_string();
    }
    let mut end = LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
