use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{QuizSlot, SlotQuestion};
use crate::repositories;

/// One requested slot of a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SlotInput {
    pub(crate) question_id: String,
    pub(crate) slot_index: i32,
    pub(crate) block: i32,
}

#[derive(Debug, Error)]
pub(crate) enum SlotAssemblyError {
    #[error("At least one slot is required")]
    Empty,
    #[error("slot_index {0} is used more than once")]
    DuplicateSlotIndex(i32),
    #[error("block must not be negative (slot_index {0})")]
    NegativeBlock(i32),
    #[error("Question {0} does not exist")]
    UnknownQuestion(String),
    #[error("Quiz not found")]
    QuizNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub(crate) struct ReplacedSlots {
    pub(crate) slots: Vec<QuizSlot>,
    pub(crate) total_marks: i32,
}

/// Checks a whole submission before anything is written.
pub(crate) fn validate_slots(slots: &[SlotInput]) -> Result<(), SlotAssemblyError> {
    if slots.is_empty() {
        return Err(SlotAssemblyError::Empty);
    }
    let mut seen = HashSet::with_capacity(slots.len());
    for slot in slots {
        if slot.block < 0 {
            return Err(SlotAssemblyError::NegativeBlock(slot.slot_index));
        }
        if !seen.insert(slot.slot_index) {
            return Err(SlotAssemblyError::DuplicateSlotIndex(slot.slot_index));
        }
    }
    Ok(())
}

/// Replaces every slot of the quiz and recomputes its total marks in one transaction.
pub(crate) async fn replace_slots(
    pool: &PgPool,
    quiz_id: &str,
    slots: &[SlotInput],
    now: PrimitiveDateTime,
) -> Result<ReplacedSlots, SlotAssemblyError> {
    validate_slots(slots)?;

    let mut tx = pool.begin().await?;

    repositories::quizzes::lock_by_id(&mut *tx, quiz_id)
        .await?
        .ok_or(SlotAssemblyError::QuizNotFound)?;

    let mut requested: Vec<String> = slots.iter().map(|slot| slot.question_id.clone()).collect();
    requested.sort();
    requested.dedup();
    let existing: HashSet<String> =
        repositories::questions::existing_ids(&mut *tx, &requested).await?.into_iter().collect();
    if let Some(missing) = slots.iter().find(|slot| !existing.contains(&slot.question_id)) {
        return Err(SlotAssemblyError::UnknownQuestion(missing.question_id.clone()));
    }

    let removed = repositories::quiz_slots::delete_by_quiz(&mut *tx, quiz_id).await?;

    let mut ordered: Vec<&SlotInput> = slots.iter().collect();
    ordered.sort_by_key(|slot| slot.slot_index);

    let mut created = Vec::with_capacity(ordered.len());
    for slot in ordered {
        let id = Uuid::new_v4().to_string();
        let row = repositories::quiz_slots::insert(
            &mut *tx,
            repositories::quiz_slots::CreateSlot {
                id: &id,
                quiz_id,
                question_id: &slot.question_id,
                slot_index: slot.slot_index,
                block: slot.block,
            },
        )
        .await
        .map_err(|err| {
            if crate::db::is_unique_violation(&err, repositories::quiz_slots::SLOT_INDEX_CONSTRAINT)
            {
                SlotAssemblyError::DuplicateSlotIndex(slot.slot_index)
            } else {
                SlotAssemblyError::Database(err)
            }
        })?;
        created.push(row);
    }

    let total = repositories::quiz_slots::sum_marks(&mut *tx, quiz_id).await?;
    let total_marks = i32::try_from(total).unwrap_or(i32::MAX);
    repositories::quizzes::set_total_marks(&mut *tx, quiz_id, total_marks, now).await?;

    tx.commit().await?;

    tracing::info!(
        quiz_id = %quiz_id,
        removed,
        inserted = created.len(),
        total_marks,
        "Replaced quiz slots"
    );

    Ok(ReplacedSlots { slots: created, total_marks })
}

/// Student-facing order: blocks ascending, questions shuffled inside each block.
/// The same seed always yields the same order.
pub(crate) fn order_for_attempt(mut slots: Vec<SlotQuestion>, seed: i64) -> Vec<SlotQuestion> {
    slots.sort_by_key(|slot| (slot.block, slot.slot_index));

    let mut rng = StdRng::seed_from_u64(seed as u64);
    let mut start = 0;
    while start < slots.len() {
        let block = slots[start].block;
        let end = slots[start..]
            .iter()
            .position(|slot| slot.block != block)
            .map_or(slots.len(), |offset| start + offset);
        slots[start..end].shuffle(&mut rng);
        start = end;
    }
    slots
}
