//! # Repeat/Shuffle Policy
//!
//! Decides where the cursor goes when playback advances or steps back.
//!
//! [`decide`] is a pure function of the queue length, the cursor, the mode and
//! the direction. Shuffle additionally consults the per-cycle
//! [`ShuffleHistory`] and draws from the supplied random generator; the
//! caller owns both and records the outcome afterwards.
//!
//! Rules:
//! - `repeat = one`: both directions stay on the cursor (restart).
//! - Forward, in order: `cursor + 1`; at the end `all` wraps to 0, `off` stops.
//! - Backward, in order: `cursor - 1`; at 0 `all` wraps to `len - 1`, `off`
//!   restarts the first track.
//! - Forward, shuffled: a random index not yet visited in the current cycle
//!   (never the cursor). When the cycle is exhausted `all` starts a new one
//!   and `off` stops.
//! - Backward, shuffled: the previously visited index, or a restart when the
//!   cycle has no history.

use rand::Rng;

use crate::model::{PlaybackMode, RepeatMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Make `index` current. Equal to the cursor means restart.
    Move(usize),
    /// Nothing left to play.
    Stop,
}

/// Indices visited during the current shuffle cycle, oldest first. The last
/// entry is the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShuffleHistory {
    order: Vec<usize>,
}

impl ShuffleHistory {
    /// Start a fresh cycle at `start`.
    pub fn reset(&mut self, start: Option<usize>) {
        self.order.clear();
        self.order.extend(start);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.order.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Index visited before the cursor, if any.
    pub fn previous(&self) -> Option<usize> {
        self.order.len().checked_sub(2).map(|i| self.order[i])
    }

    /// Record a forward move. Landing on an already visited index means a
    /// new cycle began.
    pub fn record_forward(&mut self, from: usize, to: usize) {
        if self.contains(to) {
            self.order.clear();
            self.order.push(from);
        }
        self.order.push(to);
    }

    /// Record a backward move through the history.
    pub fn record_backward(&mut self) {
        self.order.pop();
    }

    /// Record an explicit jump (skip or re-clamp after removal).
    pub fn record_jump(&mut self, to: usize) {
        self.order.retain(|&index| index != to);
        self.order.push(to);
    }

    /// Keep indices consistent with a removal from the queue.
    pub fn on_removed(&mut self, removed: usize) {
        self.order.retain(|&index| index != removed);
        for index in &mut self.order {
            if *index > removed {
                *index -= 1;
            }
        }
    }
}

/// Evaluate the policy for a queue of `len` tracks positioned at `cursor`.
pub fn decide<R: Rng + ?Sized>(
    len: usize,
    cursor: usize,
    mode: PlaybackMode,
    direction: Direction,
    history: &ShuffleHistory,
    rng: &mut R,
) -> Decision {
    if len == 0 || cursor >= len {
        return Decision::Stop;
    }

    if mode.repeat == RepeatMode::One {
        return Decision::Move(cursor);
    }

    match (direction, mode.shuffle) {
        (Direction::Forward, false) => {
            if cursor + 1 < len {
                Decision::Move(cursor + 1)
            } else if mode.repeat == RepeatMode::All {
                Decision::Move(0)
            } else {
                Decision::Stop
            }
        }
        (Direction::Backward, false) => {
            if cursor > 0 {
                Decision::Move(cursor - 1)
            } else if mode.repeat == RepeatMode::All {
                Decision::Move(len - 1)
            } else {
                Decision::Move(cursor)
            }
        }
        (Direction::Forward, true) => {
            let unvisited: Vec<usize> = (0..len)
                .filter(|&index| index != cursor && !history.contains(index))
                .collect();

            if !unvisited.is_empty() {
                return Decision::Move(unvisited[rng.gen_range(0..unvisited.len())]);
            }

            match mode.repeat {
                RepeatMode::All if len == 1 => Decision::Move(cursor),
                RepeatMode::All => {
                    // New cycle: anything but the track that just played.
                    let pick = rng.gen_range(0..len - 1);
                    Decision::Move(if pick >= cursor { pick + 1 } else { pick })
                }
                _ => Decision::Stop,
            }
        }
        (Direction::Backward, true) => match history.previous() {
            Some(index) if index < len => Decision::Move(index),
            _ => Decision::Move(cursor),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mode(repeat: RepeatMode, shuffle: bool) -> PlaybackMode {
        PlaybackMode { repeat, shuffle }
    }

    fn forward(len: usize, cursor: usize, mode: PlaybackMode) -> Decision {
        let mut rng = StdRng::seed_from_u64(7);
        decide(len, cursor, mode, Direction::Forward, &ShuffleHistory::default(), &mut rng)
    }

    fn backward(len: usize, cursor: usize, mode: PlaybackMode) -> Decision {
        let mut rng = StdRng::seed_from_u64(7);
        decide(len, cursor, mode, Direction::Backward, &ShuffleHistory::default(), &mut rng)
    }

    #[test]
    fn test_forward_in_order() {
        let off = mode(RepeatMode::Off, false);
        assert_eq!(forward(3, 0, off), Decision::Move(1));
        assert_eq!(forward(3, 2, off), Decision::Stop);
        assert_eq!(forward(3, 2, mode(RepeatMode::All, false)), Decision::Move(0));
    }

    #[test]
    fn test_repeat_one_stays_on_cursor() {
        for shuffle in [false, true] {
            let one = mode(RepeatMode::One, shuffle);
            assert_eq!(forward(4, 3, one), Decision::Move(3));
            assert_eq!(forward(4, 1, one), Decision::Move(1));
            assert_eq!(backward(4, 0, one), Decision::Move(0));
        }
    }

    #[test]
    fn test_backward_at_start() {
        assert_eq!(backward(3, 0, mode(RepeatMode::Off, false)), Decision::Move(0));
        assert_eq!(backward(3, 0, mode(RepeatMode::All, false)), Decision::Move(2));
        assert_eq!(backward(3, 2, mode(RepeatMode::Off, false)), Decision::Move(1));
    }

    #[test]
    fn test_repeat_all_cycles_back_to_start() {
        let all = mode(RepeatMode::All, false);
        for start in 0..5 {
            let mut cursor = start;
            for _ in 0..5 {
                match forward(5, cursor, all) {
                    Decision::Move(next) => cursor = next,
                    Decision::Stop => panic!("repeat all never stops"),
                }
            }
            assert_eq!(cursor, start);
        }
    }

    #[test]
    fn test_empty_queue_stops() {
        assert_eq!(forward(0, 0, PlaybackMode::default()), Decision::Stop);
    }

    #[test]
    fn test_shuffle_visits_every_index_once_per_cycle() {
        let shuffled = mode(RepeatMode::Off, true);
        let mut rng = StdRng::seed_from_u64(42);
        let mut history = ShuffleHistory::default();
        history.reset(Some(0));

        let mut cursor = 0;
        let mut seen = vec![0];
        for _ in 0..4 {
            let Decision::Move(next) =
                decide(5, cursor, shuffled, Direction::Forward, &history, &mut rng)
            else {
                panic!("cycle not exhausted yet");
            };
            assert_ne!(next, cursor);
            assert!(!seen.contains(&next));
            history.record_forward(cursor, next);
            seen.push(next);
            cursor = next;
        }

        assert_eq!(
            decide(5, cursor, shuffled, Direction::Forward, &history, &mut rng),
            Decision::Stop
        );
    }

    #[test]
    fn test_shuffle_repeat_all_starts_new_cycle() {
        let shuffled = mode(RepeatMode::All, true);
        let mut rng = StdRng::seed_from_u64(3);
        let mut history = ShuffleHistory::default();
        history.reset(Some(0));
        history.record_forward(0, 2);
        history.record_forward(2, 1);

        let decision = decide(3, 1, shuffled, Direction::Forward, &history, &mut rng);
        let Decision::Move(next) = decision else {
            panic!("repeat all never stops");
        };
        assert_ne!(next, 1);

        history.record_forward(1, next);
        assert_eq!(history.len(), 2);
        assert_eq!(history.previous(), Some(1));
    }

    #[test]
    fn test_shuffle_backward_walks_history() {
        let shuffled = mode(RepeatMode::Off, true);
        let mut rng = StdRng::seed_from_u64(1);
        let mut history = ShuffleHistory::default();
        history.reset(Some(3));
        history.record_forward(3, 0);

        assert_eq!(
            decide(4, 0, shuffled, Direction::Backward, &history, &mut rng),
            Decision::Move(3)
        );
        history.record_backward();
        assert_eq!(
            decide(4, 3, shuffled, Direction::Backward, &history, &mut rng),
            Decision::Move(3)
        );
    }

    #[test]
    fn test_history_follows_removals() {
        let mut history = ShuffleHistory::default();
        history.reset(Some(4));
        history.record_forward(4, 1);
        history.record_forward(1, 2);

        history.on_removed(1);
        assert_eq!(history.previous(), Some(3));
        assert!(history.contains(1));
        assert!(!history.contains(2));
    }

    #[test]
    fn test_record_jump_moves_index_to_end() {
        let mut history = ShuffleHistory::default();
        history.reset(Some(0));
        history.record_forward(0, 2);
        history.record_jump(0);
        assert_eq!(history.previous(), Some(2));
        assert_eq!(history.len(), 2);
    }
}
