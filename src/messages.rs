use tokio::sync::mpsc;

/// Text decoded from a frame, on its way to the view-model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrDecodedMessage {
    pub result: String,
}

impl QrDecodedMessage {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

pub type DecodedSender = mpsc::UnboundedSender<QrDecodedMessage>;
pub type DecodedReceiver = mpsc::UnboundedReceiver<QrDecodedMessage>;

/// Create the channel between the decode loop and its listener
pub fn channel() -> (DecodedSender, DecodedReceiver) {
    mpsc::unbounded_channel()
}
