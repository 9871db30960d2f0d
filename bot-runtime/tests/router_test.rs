//! Integration tests for [`bot_runtime::RoomEventRouter`].
//!
//! Covers: leaving departed rooms, per-room outcome aggregation, handler error isolation, routing a
//! batch when listing or leaving rooms fails, the empty-rooms transition, and the REGISTERED → JOINED
//! transition on an accepted invite.

mod common;

use async_trait::async_trait;
use bot_core::{BotConfig, BotError, BotState, Event, LoopState, Result};
use bot_runtime::{BotBehavior, BotContext, CycleOutcome, RoomEventRouter};
use common::{context, message, response, with_invite, with_joined, with_left, FakeMatrixClient, OWNER};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Answers each joined room with a fixed outcome and records the rooms it was called for.
#[derive(Default)]
struct ScriptedBehavior {
    room_outcomes: HashMap<String, std::result::Result<LoopState, String>>,
    invite_outcome: Option<LoopState>,
    visited: Mutex<Vec<String>>,
}

impl ScriptedBehavior {
    fn rooms(outcomes: &[(&str, std::result::Result<LoopState, &str>)]) -> Self {
        Self {
            room_outcomes: outcomes
                .iter()
                .map(|(room, outcome)| (room.to_string(), outcome.map_err(str::to_string)))
                .collect(),
            ..Default::default()
        }
    }

    fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl BotBehavior for ScriptedBehavior {
    async fn on_new(&self, _ctx: &BotContext) -> Result<LoopState> {
        Ok(LoopState::NextState)
    }

    async fn on_invites(
        &self,
        _ctx: &BotContext,
        invites: &BTreeMap<String, Vec<Event>>,
    ) -> Result<LoopState> {
        if invites.is_empty() {
            return Ok(LoopState::Run);
        }
        Ok(self.invite_outcome.unwrap_or(LoopState::Run))
    }

    async fn on_joined_room(
        &self,
        _ctx: &BotContext,
        room_id: &str,
        _events: &[Event],
    ) -> Result<LoopState> {
        self.visited.lock().unwrap().push(room_id.to_string());
        match self.room_outcomes.get(room_id) {
            Some(Ok(outcome)) => Ok(*outcome),
            Some(Err(message)) => Err(BotError::Handler(message.clone())),
            None => Ok(LoopState::Run),
        }
    }
}

fn joined_config() -> BotConfig {
    let mut config = BotConfig::new("bot-1");
    config.set_state(BotState::Joined);
    config.owner = Some(OWNER.to_string());
    config
}

async fn route_joined(
    behavior: ScriptedBehavior,
    client: &Arc<FakeMatrixClient>,
    config: BotConfig,
    rooms: &[&str],
) -> (CycleOutcome, Arc<ScriptedBehavior>) {
    let ctx = context(config, client).await;
    let behavior = Arc::new(behavior);
    let router = RoomEventRouter::new(behavior.clone());

    let mut sync = response("s1");
    for room in rooms {
        sync = with_joined(sync, room, vec![message(OWNER, "hello")]);
    }
    let outcome = router.route_joined(&ctx, &sync).await.unwrap();
    (outcome, behavior)
}

/// **Test: A left room that is still joined is left; one that is not, is not.**
///
/// **Setup:** Joined listing contains `!a` and `!b`; the response reports `!a` and `!gone` as left.
/// **Action:** `route_joined`.
/// **Expected:** Exactly one leave call, for `!a`.
#[tokio::test]
async fn test_left_rooms_are_left_only_when_still_joined() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org", "!b:example.org"]);
    let ctx = context(joined_config(), &client).await;
    let router = RoomEventRouter::new(Arc::new(ScriptedBehavior::default()));

    let sync = with_left(with_left(response("s1"), "!a:example.org"), "!gone:example.org");
    let outcome = router.route_joined(&ctx, &sync).await.unwrap();

    assert_eq!(client.leaves(), vec!["!a:example.org"]);
    assert_eq!(outcome, CycleOutcome::run());
}

/// **Test: Without left rooms nothing is left.**
#[tokio::test]
async fn test_no_left_rooms_means_no_leave_calls() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org"]);
    let (outcome, _) = route_joined(
        ScriptedBehavior::default(),
        &client,
        joined_config(),
        &["!a:example.org"],
    )
    .await;

    assert!(client.leaves().is_empty());
    assert_eq!(outcome.loop_state, LoopState::Run);
}

/// **Test: NextState from one room wins over Run from the others.**
///
/// **Setup:** Three joined rooms answering Run, NextState, Run.
/// **Action:** `route_joined`.
/// **Expected:** Every room is visited; aggregate is NextState without a transition.
#[tokio::test]
async fn test_next_state_dominates_run() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org", "!b:example.org", "!c:example.org"]);
    let behavior = ScriptedBehavior::rooms(&[
        ("!a:example.org", Ok(LoopState::Run)),
        ("!b:example.org", Ok(LoopState::NextState)),
        ("!c:example.org", Ok(LoopState::Run)),
    ]);
    let (outcome, behavior) = route_joined(
        behavior,
        &client,
        joined_config(),
        &["!a:example.org", "!b:example.org", "!c:example.org"],
    )
    .await;

    assert_eq!(behavior.visited().len(), 3);
    assert_eq!(outcome, LoopState::NextState.into());
}

/// **Test: Exit dominates every other outcome.**
#[tokio::test]
async fn test_exit_dominates_next_state() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org", "!b:example.org", "!c:example.org"]);
    let behavior = ScriptedBehavior::rooms(&[
        ("!a:example.org", Ok(LoopState::Run)),
        ("!b:example.org", Ok(LoopState::Exit)),
        ("!c:example.org", Ok(LoopState::NextState)),
    ]);
    let (outcome, _) = route_joined(
        behavior,
        &client,
        joined_config(),
        &["!a:example.org", "!b:example.org", "!c:example.org"],
    )
    .await;

    assert_eq!(outcome.loop_state, LoopState::Exit);
}

/// **Test: A failing room does not stop the other rooms from being handled.**
///
/// **Setup:** `!a` fails, `!b` answers NextState.
/// **Action:** `route_joined`.
/// **Expected:** Both rooms visited; the failure counts as Run so the aggregate is NextState.
#[tokio::test]
async fn test_room_handler_error_is_isolated() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org", "!b:example.org"]);
    let behavior = ScriptedBehavior::rooms(&[
        ("!a:example.org", Err("room handler failed")),
        ("!b:example.org", Ok(LoopState::NextState)),
    ]);
    let (outcome, behavior) = route_joined(
        behavior,
        &client,
        joined_config(),
        &["!a:example.org", "!b:example.org"],
    )
    .await;

    assert_eq!(behavior.visited(), vec!["!a:example.org", "!b:example.org"]);
    assert_eq!(outcome.loop_state, LoopState::NextState);
}

/// **Test: With no joined room left the bot moves to REGISTERED by default.**
#[tokio::test]
async fn test_empty_rooms_moves_to_registered() {
    let client = Arc::new(FakeMatrixClient::new());
    let (outcome, _) =
        route_joined(ScriptedBehavior::default(), &client, joined_config(), &[]).await;

    assert_eq!(outcome, CycleOutcome::transition_to(BotState::Registered));
}

/// **Test: With exit_on_empty_rooms the bot moves to DELETED once its last room is left.**
///
/// **Setup:** Joined to `!a` only; the response reports `!a` as left.
/// **Action:** `route_joined`.
/// **Expected:** `!a` is left and the outcome transitions to DELETED.
#[tokio::test]
async fn test_empty_rooms_with_exit_moves_to_deleted() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org"]);
    let mut config = joined_config();
    config.exit_on_empty_rooms = true;
    let ctx = context(config, &client).await;
    let router = RoomEventRouter::new(Arc::new(ScriptedBehavior::default()));

    let outcome = router
        .route_joined(&ctx, &with_left(response("s1"), "!a:example.org"))
        .await
        .unwrap();

    assert_eq!(client.leaves(), vec!["!a:example.org"]);
    assert_eq!(outcome, CycleOutcome::transition_to(BotState::Deleted));
}

/// **Test: An accepted invite in REGISTERED requests the JOINED transition.**
///
/// **Setup:** Behavior answers NextState for invites.
/// **Action:** `route_registered` with and without an invite.
/// **Expected:** Transition to JOINED with the invite; plain Run without.
#[tokio::test]
async fn test_registered_invite_transitions_to_joined() {
    let client = Arc::new(FakeMatrixClient::new());
    let mut config = BotConfig::new("bot-1");
    config.set_state(BotState::Registered);
    let ctx = context(config, &client).await;
    let router = RoomEventRouter::new(Arc::new(ScriptedBehavior {
        invite_outcome: Some(LoopState::NextState),
        ..Default::default()
    }));

    let invited = with_invite(response("s1"), "!room:example.org", OWNER);
    let outcome = router.route_registered(&ctx, &invited).await.unwrap();
    assert_eq!(outcome, CycleOutcome::transition_to(BotState::Joined));

    let outcome = router.route_registered(&ctx, &response("s2")).await.unwrap();
    assert_eq!(outcome, CycleOutcome::run());
}

/// **Test: A failed joined-room listing before leaving does not drop the joined rooms of the batch.**
///
/// **Setup:** Joined to `!a` and `!gone`; the response carries a message in `!a` and reports `!gone`
/// as left; the first `joined_rooms` call fails.
/// **Action:** `route_joined`.
/// **Expected:** `Ok`; `!a` is still routed and its NextState is returned; no leave is attempted.
#[tokio::test]
async fn test_listing_failure_before_leave_still_routes_joined_rooms() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org", "!gone:example.org"]);
    client.fail_joined_rooms(1);
    let ctx = context(joined_config(), &client).await;
    let behavior = Arc::new(ScriptedBehavior::rooms(&[(
        "!a:example.org",
        Ok(LoopState::NextState),
    )]));
    let router = RoomEventRouter::new(behavior.clone());

    let sync = with_left(
        with_joined(response("s1"), "!a:example.org", vec![message(OWNER, "hello")]),
        "!gone:example.org",
    );
    let outcome = router.route_joined(&ctx, &sync).await.unwrap();

    assert_eq!(behavior.visited(), vec!["!a:example.org"]);
    assert!(client.leaves().is_empty());
    assert_eq!(outcome, LoopState::NextState.into());
}

/// **Test: A failed final joined-room listing keeps the routed outcome.**
///
/// **Setup:** Joined to `!a`, which answers NextState; the final `joined_rooms` call fails.
/// **Action:** `route_joined`.
/// **Expected:** `Ok(NextState)` without an empty-rooms transition.
#[tokio::test]
async fn test_final_listing_failure_returns_aggregate() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org"]);
    client.fail_joined_rooms(1);
    let behavior = ScriptedBehavior::rooms(&[("!a:example.org", Ok(LoopState::NextState))]);
    let (outcome, behavior) =
        route_joined(behavior, &client, joined_config(), &["!a:example.org"]).await;

    assert_eq!(behavior.visited(), vec!["!a:example.org"]);
    assert_eq!(outcome, LoopState::NextState.into());
}

/// **Test: A room that cannot be left does not stop the others from being left.**
///
/// **Setup:** Joined to `!a`, `!b`, `!c`; the response reports `!a` and `!b` as left; leaving `!a`
/// fails.
/// **Action:** `route_joined`.
/// **Expected:** `Ok(Run)`; `!b` is left.
#[tokio::test]
async fn test_failed_leave_does_not_block_other_rooms() {
    let client = Arc::new(FakeMatrixClient::new());
    client.set_joined(&["!a:example.org", "!b:example.org", "!c:example.org"]);
    client.fail_leave("!a:example.org");
    let ctx = context(joined_config(), &client).await;
    let router = RoomEventRouter::new(Arc::new(ScriptedBehavior::default()));

    let sync = with_left(with_left(response("s1"), "!a:example.org"), "!b:example.org");
    let outcome = router.route_joined(&ctx, &sync).await.unwrap();

    assert_eq!(client.leaves(), vec!["!b:example.org"]);
    assert_eq!(outcome, CycleOutcome::run());
}
