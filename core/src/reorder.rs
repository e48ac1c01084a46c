//! Drag-to-reorder with optimistic local feedback and rollback.
//!
//! # Design
//! `ReorderController` keeps two lists. `committed` is the last authoritative
//! fetch, sorted by its order field. `tentative` exists only while a drag or
//! its persist is in progress and is what the view shows. A persist always
//! ends with a re-fetch replacing `committed` and dropping `tentative`, so a
//! speculative order never outlives the request that tried to save it.
//!
//! `end_drag` / `complete` are the sans-IO halves of a persist; `commit`
//! drives them against an `AdminClient`.

use thiserror::Error;

use crate::client::AdminClient;
use crate::envelope::{parse_entity, parse_list};
use crate::error::ApiError;
use crate::http::Transport;
use crate::session::SessionStore;
use crate::types::{Contest, ContestProblem, ContestStatus, Module, ModuleOrder, ProblemOrder};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReorderError {
    #[error("this list cannot be reordered in its current state")]
    Locked,

    #[error("index {index} is out of range for a list of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("a reorder is already being saved")]
    Busy,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// An entity positioned by an integer order field.
pub trait Orderable {
    fn order_id(&self) -> &str;
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

impl Orderable for Module {
    fn order_id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Orderable for ContestProblem {
    fn order_id(&self) -> &str {
        &self.problem_id
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

/// One entry of a batch reorder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAssignment {
    pub id: String,
    pub order: i64,
}

/// The backend scope a reorderable list lives in.
pub trait OrderedCollection {
    type Item: Orderable + Clone;

    /// Order value given to the first position.
    const ORDER_BASE: i64 = 1;

    fn fetch<T: Transport, S: SessionStore>(
        &mut self,
        client: &mut AdminClient<T, S>,
    ) -> Result<Vec<Self::Item>, ApiError>;

    fn submit<T: Transport, S: SessionStore>(
        &self,
        client: &mut AdminClient<T, S>,
        batch: &[OrderAssignment],
    ) -> Result<(), ApiError>;

    fn allows_reorder(&self) -> bool {
        true
    }
}

/// All modules, ordered from 1.
#[derive(Debug, Clone, Default)]
pub struct ModuleCollection;

impl OrderedCollection for ModuleCollection {
    type Item = Module;

    fn fetch<T: Transport, S: SessionStore>(
        &mut self,
        client: &mut AdminClient<T, S>,
    ) -> Result<Vec<Module>, ApiError> {
        let body = client.list_modules(&Default::default())?;
        parse_list(&body, "modules")
    }

    fn submit<T: Transport, S: SessionStore>(
        &self,
        client: &mut AdminClient<T, S>,
        batch: &[OrderAssignment],
    ) -> Result<(), ApiError> {
        let orders: Vec<ModuleOrder> = batch
            .iter()
            .map(|a| ModuleOrder {
                module_id: a.id.clone(),
                order: a.order,
            })
            .collect();
        client.reorder_modules(&orders).map(|_| ())
    }
}

/// The problems of one contest, ordered from 1. Only a draft contest can be
/// reordered; the status comes from the last fetch.
#[derive(Debug, Clone)]
pub struct ContestProblemCollection {
    contest_id: String,
    status: Option<ContestStatus>,
}

impl ContestProblemCollection {
    pub fn new(contest_id: &str) -> Self {
        Self {
            contest_id: contest_id.to_string(),
            status: None,
        }
    }

    pub fn contest_id(&self) -> &str {
        &self.contest_id
    }

    pub fn status(&self) -> Option<ContestStatus> {
        self.status
    }
}

impl OrderedCollection for ContestProblemCollection {
    type Item = ContestProblem;

    fn fetch<T: Transport, S: SessionStore>(
        &mut self,
        client: &mut AdminClient<T, S>,
    ) -> Result<Vec<ContestProblem>, ApiError> {
        let body = client.get_contest(&self.contest_id)?;
        let contest: Contest = parse_entity(&body, "contest")?;
        self.status = Some(contest.status);
        Ok(contest.problems)
    }

    fn submit<T: Transport, S: SessionStore>(
        &self,
        client: &mut AdminClient<T, S>,
        batch: &[OrderAssignment],
    ) -> Result<(), ApiError> {
        let orders: Vec<ProblemOrder> = batch
            .iter()
            .map(|a| ProblemOrder {
                problem_id: a.id.clone(),
                order: a.order,
            })
            .collect();
        client
            .reorder_contest_problems(&self.contest_id, &orders)
            .map(|_| ())
    }

    fn allows_reorder(&self) -> bool {
        self.status == Some(ContestStatus::Draft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// `position` is where the dragged item currently sits in the tentative list.
    Dragging { position: usize },
    /// A batch has been handed out and not yet resolved.
    Persisting,
}

pub struct ReorderController<C: OrderedCollection> {
    collection: C,
    committed: Vec<C::Item>,
    tentative: Option<Vec<C::Item>>,
    phase: Phase,
}

impl<C: OrderedCollection> ReorderController<C> {
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            committed: Vec::new(),
            tentative: None,
            phase: Phase::Idle,
        }
    }

    /// What the view should render.
    pub fn items(&self) -> &[C::Item] {
        self.tentative.as_deref().unwrap_or(self.committed.as_slice())
    }

    pub fn committed(&self) -> &[C::Item] {
        &self.committed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Whether the drag handles should be enabled.
    pub fn can_drag(&self) -> bool {
        self.collection.allows_reorder() && self.phase != Phase::Persisting
    }

    /// Replace the authoritative list, abandoning any drag in progress.
    pub fn load<T: Transport, S: SessionStore>(
        &mut self,
        client: &mut AdminClient<T, S>,
    ) -> Result<(), ReorderError> {
        if self.phase == Phase::Persisting {
            return Err(ReorderError::Busy);
        }
        let fresh = self.collection.fetch(client)?;
        self.install(fresh);
        Ok(())
    }

    pub fn begin_drag(&mut self, source: usize) -> Result<(), ReorderError> {
        if self.phase == Phase::Persisting {
            return Err(ReorderError::Busy);
        }
        if !self.collection.allows_reorder() {
            return Err(ReorderError::Locked);
        }
        let len = self.items().len();
        if source >= len {
            return Err(ReorderError::IndexOutOfRange { index: source, len });
        }
        if self.tentative.is_none() {
            self.tentative = Some(self.committed.clone());
        }
        self.phase = Phase::Dragging { position: source };
        Ok(())
    }

    /// Move the dragged item to `target` in the tentative list.
    pub fn drag_over(&mut self, target: usize) -> Result<(), ReorderError> {
        let Phase::Dragging { position } = self.phase else {
            return Ok(());
        };
        if target == position {
            return Ok(());
        }
        let Some(items) = self.tentative.as_mut() else {
            return Ok(());
        };
        if target >= items.len() {
            return Err(ReorderError::IndexOutOfRange {
                index: target,
                len: items.len(),
            });
        }
        let item = items.remove(position);
        items.insert(target, item);
        self.phase = Phase::Dragging { position: target };
        Ok(())
    }

    /// Drop the drag without persisting anything.
    pub fn cancel_drag(&mut self) {
        if let Phase::Dragging { .. } = self.phase {
            self.tentative = None;
            self.phase = Phase::Idle;
        }
    }

    /// Finish the gesture. Returns the batch to persist, or `None` when no
    /// drag was active. The controller stays `Persisting` until `complete`
    /// or `abandon` is called.
    pub fn end_drag(&mut self) -> Result<Option<Vec<OrderAssignment>>, ReorderError> {
        match self.phase {
            Phase::Idle => Ok(None),
            Phase::Persisting => Err(ReorderError::Busy),
            Phase::Dragging { .. } => {
                let batch = assignments::<C>(self.items());
                self.phase = Phase::Persisting;
                Ok(Some(batch))
            }
        }
    }

    /// Resolve a persist with a freshly fetched authoritative list.
    pub fn complete(&mut self, fresh: Vec<C::Item>) {
        self.install(fresh);
    }

    /// Resolve a persist when no fresh list could be fetched: fall back to
    /// the last authoritative list.
    pub fn abandon(&mut self) {
        self.tentative = None;
        self.phase = Phase::Idle;
    }

    /// End the drag, persist the batch, then re-fetch. A failed persist is
    /// rolled back by the re-fetch and its error returned.
    pub fn commit<T: Transport, S: SessionStore>(
        &mut self,
        client: &mut AdminClient<T, S>,
    ) -> Result<(), ReorderError> {
        let Some(batch) = self.end_drag()? else {
            return Ok(());
        };

        match self.collection.submit(client, &batch) {
            Ok(()) => {
                tracing::info!(items = batch.len(), "reorder saved");
                match self.collection.fetch(client) {
                    Ok(fresh) => self.complete(fresh),
                    Err(error) => {
                        tracing::warn!(%error, "re-fetch after reorder failed; keeping saved order");
                        let saved = self.saved_order(&batch);
                        self.complete(saved);
                    }
                }
                Ok(())
            }
            Err(submit_error) => {
                tracing::warn!(error = %submit_error, "reorder failed; rolling back");
                match self.collection.fetch(client) {
                    Ok(fresh) => self.complete(fresh),
                    Err(error) => {
                        tracing::warn!(%error, "rollback re-fetch failed; restoring last fetched order");
                        self.abandon();
                    }
                }
                Err(submit_error.into())
            }
        }
    }

    /// The tentative list with the order values the backend just accepted.
    fn saved_order(&self, batch: &[OrderAssignment]) -> Vec<C::Item> {
        let mut items = self.items().to_vec();
        for (item, assignment) in items.iter_mut().zip(batch) {
            item.set_order(assignment.order);
        }
        items
    }

    fn install(&mut self, mut fresh: Vec<C::Item>) {
        fresh.sort_by_key(|item| item.order());
        self.committed = fresh;
        self.tentative = None;
        self.phase = Phase::Idle;
    }
}

/// Position-based order values for `items`, starting at `ORDER_BASE`.
pub fn assignments<C: OrderedCollection>(items: &[C::Item]) -> Vec<OrderAssignment> {
    items
        .iter()
        .zip(C::ORDER_BASE..)
        .map(|(item, order)| OrderAssignment {
            id: item.order_id().to_string(),
            order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::client::tests::{signed_in_store, ScriptedTransport};
    use crate::config::ClientConfig;
    use crate::http::HttpMethod;
    use crate::navigation::NoopNavigator;
    use crate::session::MemoryStore;

    type Client = AdminClient<ScriptedTransport, MemoryStore>;

    fn client() -> (Client, ScriptedTransport) {
        let transport = ScriptedTransport::default();
        let client = AdminClient::configure(
            &ClientConfig::new("http://api.test"),
            transport.clone(),
            signed_in_store(),
            NoopNavigator,
        );
        (client, transport)
    }

    fn modules(ids: &[&str]) -> Value {
        let list: Vec<Value> = ids
            .iter()
            .zip(1..)
            .map(|(id, order)| json!({"id": id, "name": id.to_uppercase(), "order": order}))
            .collect();
        json!({"success": true, "data": list})
    }

    fn ids<I: Orderable>(items: &[I]) -> Vec<String> {
        items.iter().map(|i| i.order_id().to_string()).collect()
    }

    fn loaded(ids: &[&str]) -> (ReorderController<ModuleCollection>, Client, ScriptedTransport) {
        let (mut client, transport) = client();
        transport.push(200, modules(ids));
        let mut controller = ReorderController::new(ModuleCollection);
        controller.load(&mut client).unwrap();
        (controller, client, transport)
    }

    #[test]
    fn load_sorts_by_order() {
        let (mut client, transport) = client();
        transport.push(
            200,
            json!({"data": [
                {"id": "m3", "name": "C", "order": 3},
                {"id": "m1", "name": "A", "order": 1},
                {"id": "m2", "name": "B", "order": 2}
            ]}),
        );
        let mut controller = ReorderController::new(ModuleCollection);
        controller.load(&mut client).unwrap();
        assert_eq!(ids(controller.items()), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn drag_over_moves_item_without_touching_committed() {
        let (mut controller, _, transport) = loaded(&["a", "b", "c", "d"]);
        controller.begin_drag(0).unwrap();
        controller.drag_over(1).unwrap();
        controller.drag_over(2).unwrap();
        controller.drag_over(2).unwrap();

        assert_eq!(ids(controller.items()), vec!["b", "c", "a", "d"]);
        assert_eq!(ids(controller.committed()), vec!["a", "b", "c", "d"]);
        assert_eq!(controller.phase(), Phase::Dragging { position: 2 });
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn drag_over_is_a_permutation_for_any_sequence() {
        let names = ["a", "b", "c", "d", "e", "f", "g"];
        let (mut controller, _, _) = loaded(&names);
        let mut expected = ids(controller.items());
        expected.sort();

        let mut seed: u64 = 0x5eed;
        let mut next = |bound: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as usize) % bound
        };
        for _ in 0..20 {
            controller.begin_drag(next(names.len())).unwrap();
            for _ in 0..10 {
                controller.drag_over(next(names.len())).unwrap();
                let mut seen = ids(controller.items());
                seen.sort();
                assert_eq!(seen, expected);
            }
            controller.cancel_drag();
        }
    }

    #[test]
    fn drag_over_out_of_range_leaves_state() {
        let (mut controller, _, _) = loaded(&["a", "b"]);
        controller.begin_drag(1).unwrap();
        let err = controller.drag_over(5).unwrap_err();
        assert_eq!(err, ReorderError::IndexOutOfRange { index: 5, len: 2 });
        assert_eq!(ids(controller.items()), vec!["a", "b"]);
        assert_eq!(controller.phase(), Phase::Dragging { position: 1 });
    }

    #[test]
    fn begin_drag_rejects_bad_index() {
        let (mut controller, _, _) = loaded(&["a"]);
        assert_eq!(
            controller.begin_drag(1),
            Err(ReorderError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn end_drag_without_drag_is_noop() {
        let (mut controller, mut client, transport) = loaded(&["a", "b"]);
        assert_eq!(controller.end_drag(), Ok(None));
        controller.commit(&mut client).unwrap();
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn end_drag_emits_batch_and_blocks_until_resolved() {
        let (mut controller, _, _) = loaded(&["m2", "m1"]);
        controller.begin_drag(1).unwrap();
        controller.drag_over(0).unwrap();

        let batch = controller.end_drag().unwrap().unwrap();
        assert_eq!(
            batch,
            vec![
                OrderAssignment {
                    id: "m1".to_string(),
                    order: 1
                },
                OrderAssignment {
                    id: "m2".to_string(),
                    order: 2
                },
            ]
        );
        assert_eq!(controller.phase(), Phase::Persisting);
        assert!(!controller.can_drag());
        assert_eq!(controller.end_drag(), Err(ReorderError::Busy));
        assert_eq!(controller.begin_drag(0), Err(ReorderError::Busy));

        controller.abandon();
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(ids(controller.items()), vec!["m2", "m1"]);
    }

    #[test]
    fn commit_submits_exact_batch_then_resyncs() {
        let (mut controller, mut client, transport) = loaded(&["m2", "m1"]);
        controller.begin_drag(1).unwrap();
        controller.drag_over(0).unwrap();

        transport.push(200, json!({"success": true}));
        transport.push(200, json!({"data": [
            {"id": "m1", "name": "M1", "order": 1},
            {"id": "m2", "name": "M2", "order": 2}
        ]}));
        controller.commit(&mut client).unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].method, HttpMethod::Put);
        let body: Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body["moduleOrders"],
            json!([{"moduleId": "m1", "order": 1}, {"moduleId": "m2", "order": 2}])
        );
        assert_eq!(sent[2].method, HttpMethod::Get);

        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(ids(controller.items()), vec!["m1", "m2"]);
        assert_eq!(ids(controller.committed()), vec!["m1", "m2"]);
    }

    #[test]
    fn commit_adopts_concurrent_edits_from_resync() {
        let (mut controller, mut client, transport) = loaded(&["a", "b"]);
        controller.begin_drag(0).unwrap();
        controller.drag_over(1).unwrap();

        transport.push(200, json!({"success": true}));
        transport.push(200, modules(&["b", "a", "z"]));
        controller.commit(&mut client).unwrap();
        assert_eq!(ids(controller.items()), vec!["b", "a", "z"]);
    }

    #[test]
    fn failed_commit_rolls_back_to_authoritative_order() {
        let (mut controller, mut client, transport) = loaded(&["a", "b", "c"]);
        controller.begin_drag(2).unwrap();
        controller.drag_over(1).unwrap();
        controller.drag_over(0).unwrap();
        assert_eq!(ids(controller.items()), vec!["c", "a", "b"]);

        transport.push(500, json!({"message": "Failed to reorder modules"}));
        transport.push(200, modules(&["a", "b", "c"]));
        let err = controller.commit(&mut client).unwrap_err();
        assert_eq!(err.to_string(), "Failed to reorder modules");
        assert_eq!(ids(controller.items()), vec!["a", "b", "c"]);
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn failed_commit_and_failed_refetch_restore_pre_drag_order() {
        let (mut controller, mut client, transport) = loaded(&["a", "b", "c"]);
        controller.begin_drag(0).unwrap();
        controller.drag_over(2).unwrap();

        transport.push_transport_error("connection reset");
        transport.push_transport_error("connection refused");
        let err = controller.commit(&mut client).unwrap_err();
        assert_eq!(
            err,
            ReorderError::Api(ApiError::Transport {
                message: "connection reset".to_string()
            })
        );
        assert_eq!(ids(controller.items()), vec!["a", "b", "c"]);
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn saved_order_is_kept_when_resync_fails() {
        let (mut controller, mut client, transport) = loaded(&["a", "b"]);
        controller.begin_drag(1).unwrap();
        controller.drag_over(0).unwrap();

        transport.push(200, json!({"success": true}));
        transport.push_transport_error("timeout");
        controller.commit(&mut client).unwrap();

        assert_eq!(ids(controller.items()), vec!["b", "a"]);
        let orders: Vec<i64> = controller.items().iter().map(Orderable::order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    fn contest(status: &str, problems: &[&str]) -> Value {
        let problems: Vec<Value> = problems
            .iter()
            .zip(1..)
            .map(|(p, order)| json!({"id": format!("cp-{p}"), "problemId": p, "order": order, "points": 100, "label": "A"}))
            .collect();
        json!({"success": true, "data": {"id": "c1", "title": "Lab 1", "status": status, "problems": problems}})
    }

    #[test]
    fn contest_problems_lock_outside_draft() {
        let (mut client, transport) = client();
        let mut controller = ReorderController::new(ContestProblemCollection::new("c1"));
        assert_eq!(controller.begin_drag(0), Err(ReorderError::Locked));

        transport.push(200, contest("LIVE", &["p1", "p2"]));
        controller.load(&mut client).unwrap();
        assert_eq!(controller.collection().status(), Some(ContestStatus::Live));
        assert!(!controller.can_drag());
        assert_eq!(controller.begin_drag(0), Err(ReorderError::Locked));
    }

    #[test]
    fn contest_problems_reorder_in_draft() {
        let (mut client, transport) = client();
        let mut controller = ReorderController::new(ContestProblemCollection::new("c1"));
        transport.push(200, contest("DRAFT", &["p1", "p2", "p3"]));
        controller.load(&mut client).unwrap();

        controller.begin_drag(0).unwrap();
        controller.drag_over(2).unwrap();
        transport.push(200, json!({"success": true}));
        transport.push(200, contest("DRAFT", &["p2", "p3", "p1"]));
        controller.commit(&mut client).unwrap();

        let sent = transport.requests();
        assert_eq!(sent[1].url, "http://api.test/api/coding-platform/contest/c1/reorder-problems");
        let body: Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"problemOrders": [
                {"problemId": "p2", "order": 1},
                {"problemId": "p3", "order": 2},
                {"problemId": "p1", "order": 3}
            ]})
        );
        assert_eq!(sent[2].url, "http://api.test/api/coding-platform/contest/get/c1");
        assert_eq!(ids(controller.items()), vec!["p2", "p3", "p1"]);
    }

    struct ZeroBased;

    impl OrderedCollection for ZeroBased {
        type Item = Module;
        const ORDER_BASE: i64 = 0;

        fn fetch<T: Transport, S: SessionStore>(
            &mut self,
            _client: &mut AdminClient<T, S>,
        ) -> Result<Vec<Module>, ApiError> {
            Ok(Vec::new())
        }

        fn submit<T: Transport, S: SessionStore>(
            &self,
            _client: &mut AdminClient<T, S>,
            _batch: &[OrderAssignment],
        ) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[test]
    fn assignments_honor_order_base() {
        let items: Vec<Module> = serde_json::from_value(json!([
            {"id": "x", "name": "X", "order": 7},
            {"id": "y", "name": "Y", "order": 9}
        ]))
        .unwrap();
        let orders: Vec<i64> = assignments::<ZeroBased>(&items).iter().map(|a| a.order).collect();
        assert_eq!(orders, vec![0, 1]);
        let orders: Vec<i64> = assignments::<ModuleCollection>(&items)
            .iter()
            .map(|a| a.order)
            .collect();
        assert_eq!(orders, vec![1, 2]);
    }
}
