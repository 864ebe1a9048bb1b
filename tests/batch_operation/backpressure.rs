use std::time::Duration;

use batchops_core::batch_operation::{BatchOperationCommandEmitter, InitializationOutcome, RetryResult};
use batchops_core::models::{BatchOperationStatus, Item};
use batchops_core::processing::{CommandBuffer, LIFECYCLE_RESERVE_BYTES};
use batchops_core::records::{
    BatchOperationIntent, CommandRecord, FollowUpCommandMetadata, Intent,
};
use batchops_core::state::BatchOperationState;

use crate::common::*;

const ITEM_COUNT: usize = 120;
const CHUNK_SIZE: usize = 10;

/// Budget fitting three of the largest chunks this fixture produces per tick
fn three_chunk_budget() -> usize {
    let widest: Vec<Item> = (ITEM_COUNT as i64 - CHUNK_SIZE as i64 + 1..=ITEM_COUNT as i64)
        .map(|key| Item::new(key, key * 1_000))
        .collect();
    let record = BatchOperationCommandEmitter::chunk_record(1, &widest);
    let size =
        CommandBuffer::encoded_size(&record, &FollowUpCommandMetadata::for_batch_operation(1))
            .unwrap();
    LIFECYCLE_RESERVE_BYTES + 3 * size + size / 2
}

#[test]
fn test_exhausted_output_converges_over_ticks() {
    let mut driver = PartitionBuilder::new()
        .with_chunk_size(CHUNK_SIZE)
        .with_page_size(CHUNK_SIZE as u32)
        .with_command_batch_bytes(three_chunk_budget())
        .with_items(ITEM_COUNT)
        .with_operation(BatchOperationBuilder::new(1).build())
        .start();

    let reports = driver.run_until(Duration::from_secs(60));

    let continuing: Vec<(String, u32)> = driver
        .log()
        .iter()
        .filter_map(|command| match &command.record {
            CommandRecord::Initialization(record) => Some((
                record.search_result_cursor.clone(),
                record.search_query_page_size,
            )),
            _ => None,
        })
        .collect();
    assert!(continuing.len() > 1, "work spans several ticks");
    assert_eq!(continuing[0], ("30".to_string(), 5));
    assert!(continuing
        .windows(2)
        .all(|pair| pair[1].1 <= pair[0].1 && pair[1].0 != pair[0].0));

    let ticks_with_chunks = reports
        .iter()
        .filter(|report| {
            report
                .commands
                .iter()
                .any(|command| matches!(command.record, CommandRecord::Chunk(_)))
        })
        .count();
    assert_eq!(ticks_with_chunks, continuing.len() + 1);

    assert_eq!(
        chunked_item_keys(driver.log()),
        (1..=ITEM_COUNT as i64).collect::<Vec<i64>>()
    );
    assert_eq!(
        count_intent(
            driver.log(),
            Intent::BatchOperation(BatchOperationIntent::FinishInitialization)
        ),
        1
    );
    let operation = driver.state().batch_operation(1).unwrap();
    assert_eq!(operation.status, BatchOperationStatus::Active);
    assert_eq!(operation.total_items_processed, ITEM_COUNT as u64);
}

#[test]
fn test_every_tick_stays_within_budget() {
    let budget = three_chunk_budget();
    let mut driver = PartitionBuilder::new()
        .with_chunk_size(CHUNK_SIZE)
        .with_page_size(CHUNK_SIZE as u32)
        .with_command_batch_bytes(budget)
        .with_items(ITEM_COUNT)
        .with_operation(BatchOperationBuilder::new(1).build())
        .start();

    for report in driver.run_until(Duration::from_secs(60)) {
        let used: usize = report
            .commands
            .iter()
            .map(|command| CommandBuffer::encoded_size(&command.record, &command.metadata).unwrap())
            .sum();
        assert!(used <= budget, "tick at {:?} used {used} of {budget}", report.at);

        if let Some(RetryResult::Success {
            outcome: InitializationOutcome::Continue { page_size, .. },
        }) = &report.result
        {
            assert!(*page_size >= 1);
        }
    }
}

#[test]
fn test_refused_tail_of_a_committed_page_is_skipped() {
    let widest: Vec<Item> = (31..=40).map(|key| Item::new(key, key * 1_000)).collect();
    let chunk_bytes = CommandBuffer::encoded_size(
        &BatchOperationCommandEmitter::chunk_record(1, &widest),
        &FollowUpCommandMetadata::for_batch_operation(1),
    )
    .unwrap();
    let mut driver = PartitionBuilder::new()
        .with_chunk_size(10)
        .with_page_size(20)
        .with_command_batch_bytes(LIFECYCLE_RESERVE_BYTES + chunk_bytes + chunk_bytes / 2)
        .with_items(40)
        .with_operation(BatchOperationBuilder::new(1).build())
        .start();

    driver.run_until(Duration::from_secs(30));

    let expected: Vec<i64> = (1..=10).chain(21..=40).collect();
    assert_eq!(chunked_item_keys(driver.log()), expected);
    assert_eq!(
        count_intent(
            driver.log(),
            Intent::BatchOperation(BatchOperationIntent::FinishInitialization)
        ),
        1
    );
    let operation = driver.state().batch_operation(1).unwrap();
    assert_eq!(operation.status, BatchOperationStatus::Active);
    assert_eq!(operation.total_items_processed, 30);
}
