use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use checkout_engine::{
    db_types::{PaymentStatus, SessionId},
    traits::{PaymentGateway, PaymentGatewayError},
};

/// A scripted payment provider. Sessions are unpaid unless told otherwise.
#[derive(Clone, Default)]
pub struct StubGateway {
    responses: Arc<Mutex<HashMap<SessionId, Result<PaymentStatus, PaymentGatewayError>>>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_paid(&self, session_id: &str) {
        self.set_response(session_id, Ok(PaymentStatus::paid()));
    }

    pub fn set_unpaid(&self, session_id: &str) {
        self.set_response(session_id, Ok(PaymentStatus::unpaid()));
    }

    pub fn set_failing(&self, session_id: &str) {
        let err = PaymentGatewayError::Transport("connection reset by peer".into());
        self.set_response(session_id, Err(err));
    }

    fn set_response(&self, session_id: &str, response: Result<PaymentStatus, PaymentGatewayError>) {
        self.responses.lock().unwrap().insert(SessionId::from(session_id), response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for StubGateway {
    async fn fetch_payment_status(&self, session_id: &SessionId) -> Result<PaymentStatus, PaymentGatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.responses.lock().unwrap().get(session_id).cloned();
        response.unwrap_or(Ok(PaymentStatus::unpaid()))
    }
}
