use std::sync::Arc;
use std::time::Duration;

use batchops_core::batch_operation::{
    BatchOperationInitializationScheduler, InitializationOutcome, RetryResult,
};
use batchops_core::config::BatchOperationConfig;
use batchops_core::item_source::{ItemSourceError, ItemSourceRegistry, SearchErrorReason};
use batchops_core::models::BatchOperationType;
use batchops_core::processing::ScheduledTask;
use batchops_core::records::{
    BatchOperationExecutionIntent, BatchOperationIntent, CommandRecord, Intent,
};
use batchops_core::state::InMemoryBatchOperationState;

use crate::common::*;

const TICK: ScheduledTask = ScheduledTask::InitializationTick;

struct Harness {
    source: Arc<ScriptedItemSource>,
    scheduler: BatchOperationInitializationScheduler,
    schedule: RecordingSchedule,
}

fn harness(source: ScriptedItemSource) -> Harness {
    let state = Arc::new(InMemoryBatchOperationState::new());
    state.insert(BatchOperationBuilder::new(1).build());
    let source = Arc::new(source);
    let registry =
        ItemSourceRegistry::new().with_source(BatchOperationType::CancelProcessInstance, source.clone());
    let config = BatchOperationConfig {
        chunk_size: 2,
        query_page_size: 8,
        ..BatchOperationConfig::default()
    };
    Harness {
        scheduler: BatchOperationInitializationScheduler::from_config(
            &config,
            state.clone(),
            Arc::new(registry),
        ),
        source,
        schedule: RecordingSchedule::new(),
    }
}

#[test]
fn test_every_tick_reschedules_at_the_interval() {
    let mut h = harness(ScriptedItemSource::new().page(&[1], "end", true));
    let mut sink = BoundedSink::unlimited();

    for _ in 0..3 {
        h.scheduler.execute(TICK, &mut sink, &mut h.schedule);
    }

    assert_eq!(
        h.schedule.tasks(),
        vec![(Duration::from_millis(1_000), TICK); 3]
    );
}

#[test]
fn test_full_page_chunks_then_finish_and_execute() {
    let mut h = harness(ScriptedItemSource::new().page(&[1, 2, 3, 4, 5], "end", true));
    let mut sink = BoundedSink::unlimited();

    let result = h.scheduler.execute(TICK, &mut sink, &mut h.schedule);

    assert!(matches!(
        result,
        Some(RetryResult::Success {
            outcome: InitializationOutcome::Finished { items_processed: 5 }
        })
    ));
    let sizes: Vec<usize> = sink
        .commands
        .iter()
        .filter_map(|command| match &command.record {
            CommandRecord::Chunk(chunk) => Some(chunk.items.len()),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(
        sink.intents()[3..],
        [
            Intent::BatchOperation(BatchOperationIntent::FinishInitialization),
            Intent::Execution(BatchOperationExecutionIntent::Execute),
        ]
    );
}

#[test]
fn test_capacity_refusal_halves_page_size() {
    let mut h = harness(ScriptedItemSource::new().page(&[1, 2, 3], "p1", false));
    let mut sink = BoundedSink::admitting(0);

    h.scheduler.execute(TICK, &mut sink, &mut h.schedule);

    assert_eq!(
        sink.intents(),
        vec![Intent::BatchOperation(BatchOperationIntent::Initialize)]
    );
    match &sink.commands[0].record {
        CommandRecord::Initialization(record) => {
            assert_eq!(record.search_result_cursor, "");
            assert_eq!(record.search_query_page_size, 4);
        }
        other => panic!("unexpected record {other:?}"),
    }
}

#[test]
fn test_unchanged_state_is_fetched_once() {
    let mut h = harness(ScriptedItemSource::new().page(&[1, 2, 3], "p1", false));
    let mut sink = BoundedSink::admitting(0);

    let results: Vec<Option<RetryResult>> = (0..4)
        .map(|_| h.scheduler.execute(TICK, &mut sink, &mut h.schedule))
        .collect();

    assert!(results[0].is_some());
    assert!(results[1..].iter().all(Option::is_none));
    assert_eq!(h.source.fetch_count(), 1);
}

#[test]
fn test_retry_delays_grow_with_each_attempt() {
    let mut h = harness(
        ScriptedItemSource::new().fail_times(3, ItemSourceError::Unavailable("busy".to_string())),
    );
    let mut sink = BoundedSink::unlimited();

    h.scheduler.execute(TICK, &mut sink, &mut h.schedule);
    h.scheduler.execute(
        ScheduledTask::InitializationRetry {
            batch_operation_key: 1,
            attempt: 1,
        },
        &mut sink,
        &mut h.schedule,
    );

    assert_eq!(
        h.schedule.retries(),
        vec![
            (
                Duration::from_millis(1_000),
                ScheduledTask::InitializationRetry {
                    batch_operation_key: 1,
                    attempt: 1
                }
            ),
            (
                Duration::from_millis(2_000),
                ScheduledTask::InitializationRetry {
                    batch_operation_key: 1,
                    attempt: 2
                }
            ),
        ]
    );
    assert_eq!(h.scheduler.pending_retry(), Some((1, 2)));
}

#[test]
fn test_not_found_fails_without_retry() {
    let mut h = harness(ScriptedItemSource::new().fail(ItemSourceError::search(
        SearchErrorReason::NotFound,
        "index missing",
    )));
    let mut sink = BoundedSink::unlimited();

    let result = h.scheduler.execute(TICK, &mut sink, &mut h.schedule);

    assert!(matches!(result, Some(RetryResult::Failure { .. })));
    assert!(h.schedule.retries().is_empty());
    assert_eq!(
        sink.intents(),
        vec![Intent::BatchOperation(BatchOperationIntent::Fail)]
    );
}

#[test]
fn test_pause_cancels_issued_tick() {
    let mut h = harness(ScriptedItemSource::new());

    h.scheduler.on_recovered(&mut h.schedule);
    h.scheduler.on_paused(&mut h.schedule);

    assert_eq!(h.schedule.cancelled.len(), 1);
    assert_eq!(h.schedule.cancelled[0], h.schedule.delayed[0].2);
    assert!(h.scheduler.is_paused());
}

#[test]
fn test_refused_continue_neither_retries_nor_memoizes() {
    let mut h = harness(
        ScriptedItemSource::new()
            .page(&[1, 2], "p1", false)
            .page(&[3, 4], "p2", false)
            .fail(ItemSourceError::Unavailable("connection reset".to_string())),
    );
    let mut sink = BoundedSink::unlimited()
        .rejecting_once(Intent::BatchOperation(BatchOperationIntent::Initialize));

    let result = h.scheduler.execute(TICK, &mut sink, &mut h.schedule);

    assert!(matches!(result, Some(RetryResult::Retry { attempt: 1, .. })));
    assert_eq!(
        sink.rejected,
        vec![Intent::BatchOperation(BatchOperationIntent::Initialize)]
    );
    assert!(h.schedule.retries().is_empty());
    assert_eq!(h.scheduler.pending_retry(), None);

    h.scheduler.execute(TICK, &mut sink, &mut h.schedule);

    assert_eq!(h.source.fetch_count(), 4, "next tick recomputes from state");
    assert_eq!(h.schedule.retries().len(), 1);
    let persisted: Vec<String> = sink
        .commands
        .iter()
        .filter_map(|command| match &command.record {
            CommandRecord::Initialization(record) => Some(record.search_result_cursor.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(persisted, vec![String::new()]);
}

#[test]
fn test_refused_failure_command_is_emitted_on_next_tick() {
    let mut h = harness(ScriptedItemSource::new().fail_times(
        3,
        ItemSourceError::search(SearchErrorReason::NotFound, "index missing"),
    ));
    let mut sink = BoundedSink::unlimited()
        .rejecting_once(Intent::BatchOperation(BatchOperationIntent::Fail));

    let first = h.scheduler.execute(TICK, &mut sink, &mut h.schedule);
    assert!(matches!(first, Some(RetryResult::Failure { .. })));
    assert!(sink.commands.is_empty());

    let second = h.scheduler.execute(TICK, &mut sink, &mut h.schedule);
    assert!(matches!(second, Some(RetryResult::Failure { .. })));
    assert_eq!(
        sink.intents(),
        vec![Intent::BatchOperation(BatchOperationIntent::Fail)]
    );

    assert!(h.scheduler.execute(TICK, &mut sink, &mut h.schedule).is_none());
    assert_eq!(h.source.fetch_count(), 2);
}
