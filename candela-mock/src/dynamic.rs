use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use candela_core::connector::{CandleConnector, FullProvider, MinimalProvider};
use candela_core::{CandelaError, FetchSize, Interval, RawPayload};

/// Instruction for how a fetch should behave.
#[derive(Clone)]
pub enum MockBehavior {
    /// Return the provided payload immediately.
    Return(RawPayload),
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Hang indefinitely (simulate a stalled provider).
    Hang,
}

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Requested symbol.
    pub symbol: String,
    /// Requested interval.
    pub interval: Interval,
    /// Requested size.
    pub size: FetchSize,
}

type RuleKey = (String, FetchSize);

#[derive(Default)]
struct InternalState {
    scripted: HashMap<RuleKey, VecDeque<MockBehavior>>,
    sticky: HashMap<RuleKey, MockBehavior>,
    calls: Vec<MockCall>,
}

impl InternalState {
    fn next_behavior(&mut self, key: &RuleKey) -> Option<MockBehavior> {
        if let Some(b) = self.scripted.get_mut(key).and_then(VecDeque::pop_front) {
            return Some(b);
        }
        self.sticky.get(key).cloned()
    }
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
#[derive(Clone)]
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Behavior used for every `(symbol, size)` call once scripted behaviors run out.
    pub async fn set_behavior(&self, symbol: &str, size: FetchSize, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard.sticky.insert((symbol.to_string(), size), behavior);
    }

    /// Queue a one-shot behavior; queued behaviors are consumed in order before the sticky one.
    pub async fn push_behavior(&self, symbol: &str, size: FetchSize, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard
            .scripted
            .entry((symbol.to_string(), size))
            .or_default()
            .push_back(behavior);
    }

    /// Every call received so far, in arrival order.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls received for `symbol` and `size`.
    pub async fn call_count(&self, symbol: &str, size: FetchSize) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.symbol == symbol && c.size == size)
            .count()
    }

    /// Clear all configured behaviors and the call log.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.scripted.clear();
        guard.sticky.clear();
        guard.calls.clear();
    }
}

/// A provider that defers all behavior to an external controller.
pub struct DynamicMockProvider {
    name: &'static str,
    minimal: bool,
    full: bool,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockProvider {
    /// Create a provider advertising both capabilities, and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
    ) -> (Arc<dyn CandleConnector>, DynamicMockController) {
        Self::with_capabilities(name, true, true)
    }

    /// Create a provider advertising only the selected capabilities.
    #[must_use]
    pub fn with_capabilities(
        name: &'static str,
        minimal: bool,
        full: bool,
    ) -> (Arc<dyn CandleConnector>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self {
            name,
            minimal,
            full,
            state,
        });
        (me as Arc<dyn CandleConnector>, controller)
    }

    async fn dispatch(
        &self,
        symbol: &str,
        interval: Interval,
        size: FetchSize,
    ) -> Result<RawPayload, CandelaError> {
        // Snapshot the behavior without holding the lock across the await below.
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.calls.push(MockCall {
                symbol: symbol.to_string(),
                interval,
                size,
            });
            guard.next_behavior(&(symbol.to_string(), size))
        };

        match behavior {
            Some(MockBehavior::Return(p)) => Ok(p),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(CandelaError::provider(
                self.name,
                format!("no behavior configured for {symbol}/{size}"),
            )),
        }
    }
}

impl CandleConnector for DynamicMockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "DynamicMock"
    }

    fn as_minimal_provider(&self) -> Option<&dyn MinimalProvider> {
        self.minimal.then_some(self as &dyn MinimalProvider)
    }

    fn as_full_provider(&self) -> Option<&dyn FullProvider> {
        self.full.then_some(self as &dyn FullProvider)
    }
}

#[async_trait]
impl MinimalProvider for DynamicMockProvider {
    async fn fetch_minimal(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<RawPayload, CandelaError> {
        self.dispatch(symbol, interval, FetchSize::Minimal).await
    }
}

#[async_trait]
impl FullProvider for DynamicMockProvider {
    async fn fetch_full(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<RawPayload, CandelaError> {
        self.dispatch(symbol, interval, FetchSize::Full).await
    }
}
