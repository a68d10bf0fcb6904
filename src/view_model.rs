use crate::dialog::DialogService;
use crate::messages::{DecodedReceiver, QrDecodedMessage};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Relays decoded messages to the dialog service while active
pub struct MainViewModel<D: DialogService> {
    dialog: Arc<D>,
    title: Arc<str>,
    subscription: Option<JoinHandle<usize>>,
}

impl<D: DialogService> MainViewModel<D> {
    pub fn new(dialog: D, title: impl Into<String>) -> Self {
        Self {
            dialog: Arc::new(dialog),
            title: Arc::from(title.into()),
            subscription: None,
        }
    }

    /// Show one decoded result
    pub fn handle(&self, message: &QrDecodedMessage) {
        tracing::info!(result = %message.result, "Showing decoded message");
        self.dialog.show_message_dialog(&message.result, &self.title);
    }

    /// Subscribe to decoded messages. Replaces any earlier subscription.
    pub fn activate(&mut self, mut events: DecodedReceiver) {
        self.deactivate();

        // Shares the dialog and title; holds no subscription of its own
        let handler = Self {
            dialog: Arc::clone(&self.dialog),
            title: Arc::clone(&self.title),
            subscription: None,
        };

        self.subscription = Some(tokio::spawn(async move {
            let mut handled = 0;
            while let Some(message) = events.recv().await {
                handler.handle(&message);
                handled += 1;
            }
            tracing::debug!("Decoded message channel closed after {} message(s)", handled);
            handled
        }));
    }

    /// Drop the subscription immediately; pending messages are discarded
    pub fn deactivate(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.abort();
        }
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    /// Wait until every sender is gone and all queued messages are shown.
    ///
    /// Returns the number of messages handled, or zero when not active.
    pub async fn closed(&mut self) -> usize {
        match self.subscription.take() {
            Some(subscription) => subscription.await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Message relay stopped abnormally");
                0
            }),
            None => 0,
        }
    }
}

impl<D: DialogService> Drop for MainViewModel<D> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
