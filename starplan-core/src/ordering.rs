//! Chronological ordering of lessons.
//!
//! Lessons are ordered by start time; lessons without a start come after all
//! dated ones. Ties keep their input order.

use chrono::NaiveDateTime;

use crate::{Error, Lesson, Result};

fn start_key(lesson: &Lesson) -> (bool, Option<NaiveDateTime>) {
    (lesson.start.is_none(), lesson.start)
}

/// Sort lessons ascending by start, stable for equal starts
pub fn sort_lessons(mut lessons: Vec<Lesson>) -> Vec<Lesson> {
    lessons.sort_by_key(start_key);
    lessons
}

/// Earliest lesson, the first one of equal starts
pub fn first_lesson(lessons: &[Lesson]) -> Result<&Lesson> {
    lessons.iter().min_by_key(|l| start_key(l)).ok_or(Error::EmptyInput)
}

/// Latest lesson, the last one of equal starts
pub fn last_lesson(lessons: &[Lesson]) -> Result<&Lesson> {
    lessons.iter().max_by_key(|l| start_key(l)).ok_or(Error::EmptyInput)
}
