use std::sync::Arc;
use std::time::Duration;

use batchops_core::batch_operation::{BatchOperationCommandEmitter, RetryResult};
use batchops_core::config::BatchOperationConfig;
use batchops_core::constants::MAX_ERROR_MESSAGE_BYTES;
use batchops_core::item_source::{
    InMemoryItemSource, ItemSourceError, ItemSourceRegistry, SearchErrorReason,
};
use batchops_core::models::{BatchOperationStatus, BatchOperationType, Item};
use batchops_core::processing::{
    CommandBuffer, PartitionDriver, ScheduledTask, LIFECYCLE_RESERVE_BYTES,
};
use batchops_core::records::{
    BatchOperationErrorType, BatchOperationIntent, CommandRecord, FollowUpCommandMetadata, Intent,
};
use batchops_core::state::{BatchOperationState, InMemoryBatchOperationState};

use crate::common::*;

const CONTINUE: Intent = Intent::BatchOperation(BatchOperationIntent::Initialize);
const FINISH: Intent = Intent::BatchOperation(BatchOperationIntent::FinishInitialization);
const FAIL: Intent = Intent::BatchOperation(BatchOperationIntent::Fail);

fn continue_cursors(driver: &PartitionDriver) -> Vec<String> {
    driver
        .log()
        .iter()
        .filter_map(|command| match &command.record {
            CommandRecord::Initialization(record) => Some(record.search_result_cursor.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_transient_failure_resumes_after_last_committed_page() {
    let source = Arc::new(
        InMemoryItemSource::with_sequential_items(100)
            .fail_on_fetch(2, ItemSourceError::Unavailable("connection reset".to_string())),
    );
    let mut driver = PartitionBuilder::new()
        .with_chunk_size(10)
        .with_page_size(20)
        .with_source(BatchOperationType::CancelProcessInstance, source.clone())
        .with_operation(BatchOperationBuilder::new(1).build())
        .start();

    let reports = driver.run_until(Duration::from_millis(2_000));

    assert!(matches!(
        reports[0].result,
        Some(RetryResult::Retry { attempt: 1, .. })
    ));
    assert_eq!(
        reports[1].task,
        ScheduledTask::InitializationRetry {
            batch_operation_key: 1,
            attempt: 1
        }
    );
    assert_eq!(continue_cursors(&driver), vec!["40".to_string()]);

    let cursors: Vec<String> = source
        .requests()
        .into_iter()
        .map(|request| request.cursor)
        .collect();
    assert_eq!(cursors, vec!["", "20", "40", "40", "60", "80"]);

    assert_eq!(
        chunked_item_keys(driver.log()),
        (1..=100).collect::<Vec<i64>>(),
        "no item is chunked twice"
    );
    assert_eq!(count_intent(driver.log(), FINISH), 1);
    assert_eq!(
        driver.state().batch_operation(1).unwrap().status,
        BatchOperationStatus::Active
    );
}

#[test]
fn test_permanent_failure_keeps_committed_chunks() {
    let source = ScriptedItemSource::new()
        .page(&[1, 2, 3], "c1", false)
        .fail(ItemSourceError::search(
            SearchErrorReason::NotFound,
            "index not found",
        ));
    let mut driver = PartitionBuilder::new()
        .with_source(BatchOperationType::CancelProcessInstance, Arc::new(source))
        .with_operation(BatchOperationBuilder::new(3).build())
        .start();

    let report = driver.step().unwrap();

    match &report.result {
        Some(RetryResult::Failure { failure }) => {
            assert_eq!(failure.resumable_cursor, "c1");
            assert_eq!(failure.error_type, BatchOperationErrorType::QueryFailed);
        }
        other => panic!("expected terminal failure, got {other:?}"),
    }
    assert_eq!(chunked_item_keys(driver.log()), vec![1, 2, 3]);
    assert_eq!(count_intent(driver.log(), FAIL), 1);
    assert_eq!(count_intent(driver.log(), FINISH), 0);
    assert_eq!(count_intent(driver.log(), CONTINUE), 0);
    assert_eq!(
        driver.state().batch_operation(3).unwrap().status,
        BatchOperationStatus::Failed
    );
}

#[test]
fn test_retries_back_off_until_budget_is_spent() {
    let source = Arc::new(ScriptedItemSource::new().fail_times(
        10,
        ItemSourceError::search(SearchErrorReason::Internal, "shard failure"),
    ));
    let mut driver = PartitionBuilder::new()
        .with_retry_max(3)
        .with_source(BatchOperationType::CancelProcessInstance, source.clone())
        .with_operation(BatchOperationBuilder::new(1).build())
        .start();

    let reports = driver.run_until(Duration::from_secs(20));

    let retry_times: Vec<Duration> = reports
        .iter()
        .filter(|report| matches!(report.task, ScheduledTask::InitializationRetry { .. }))
        .map(|report| report.at)
        .collect();
    assert_eq!(
        retry_times,
        vec![
            Duration::from_millis(2_000),
            Duration::from_millis(4_000),
            Duration::from_millis(8_000),
        ]
    );
    assert_eq!(source.fetch_count(), 4);
    assert_eq!(count_intent(driver.log(), FAIL), 1);
    assert_eq!(
        driver.state().batch_operation(1).unwrap().status,
        BatchOperationStatus::Failed
    );
}

#[test]
fn test_restarted_partition_resumes_from_persisted_cursor() {
    let config = BatchOperationConfig {
        chunk_size: 10,
        query_page_size: 20,
        ..BatchOperationConfig::default()
    };
    let source = Arc::new(
        InMemoryItemSource::with_sequential_items(60)
            .fail_on_fetch(1, ItemSourceError::Unavailable("timeout".to_string())),
    );
    let registry = Arc::new(
        ItemSourceRegistry::new().with_source(BatchOperationType::CancelProcessInstance, source),
    );
    let state = Arc::new(InMemoryBatchOperationState::new());
    state.insert(BatchOperationBuilder::new(1).build());

    let mut before_crash = PartitionDriver::new(&config, state.clone(), registry.clone());
    before_crash.start();
    before_crash.step().unwrap();
    let mut log = before_crash.log().to_vec();
    drop(before_crash);

    assert_eq!(state.batch_operation(1).unwrap().cursor(), "20");

    let mut after_restart = PartitionDriver::new(&config, state.clone(), registry);
    after_restart.start();
    let report = after_restart.step().unwrap();
    assert_eq!(report.task, ScheduledTask::InitializationTick);
    log.extend_from_slice(after_restart.log());

    assert_eq!(chunked_item_keys(&log), (1..=60).collect::<Vec<i64>>());
    assert_eq!(
        state.batch_operation(1).unwrap().status,
        BatchOperationStatus::Active
    );
}

#[test]
fn test_long_failure_message_still_fails_a_nearly_full_tick() {
    let widest: Vec<Item> = (11..=20).map(|key| Item::new(key, key * 1_000)).collect();
    let chunk_bytes = CommandBuffer::encoded_size(
        &BatchOperationCommandEmitter::chunk_record(1, &widest),
        &FollowUpCommandMetadata::for_batch_operation(1),
    )
    .unwrap();
    let source = Arc::new(InMemoryItemSource::with_sequential_items(60).fail_on_fetch(
        1,
        ItemSourceError::search(SearchErrorReason::Forbidden, "x".repeat(2_000)),
    ));
    let mut driver = PartitionBuilder::new()
        .with_chunk_size(10)
        .with_page_size(20)
        .with_command_batch_bytes(LIFECYCLE_RESERVE_BYTES + 2 * chunk_bytes + chunk_bytes / 2)
        .with_source(BatchOperationType::CancelProcessInstance, source)
        .with_operation(BatchOperationBuilder::new(1).build())
        .start();

    let report = driver.step().unwrap();

    assert!(matches!(report.result, Some(RetryResult::Failure { .. })));
    assert_eq!(chunked_item_keys(driver.log()), (1..=20).collect::<Vec<i64>>());
    assert_eq!(count_intent(driver.log(), FAIL), 1);
    let message = driver
        .log()
        .iter()
        .find_map(|command| match &command.record {
            CommandRecord::Failure(record) => Some(record.error_message.clone()),
            _ => None,
        })
        .unwrap();
    assert!(message.len() <= MAX_ERROR_MESSAGE_BYTES);
    assert_eq!(
        driver.state().batch_operation(1).unwrap().status,
        BatchOperationStatus::Failed
    );
}
