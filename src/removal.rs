//! Timed block removal, one small state machine per targeted position.

use hashbrown::HashMap;
use tellus_geom::BlockPos;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RemovalState {
    Idle,
    Removing { progress: f32 },
    Done,
}

#[derive(Debug, Default)]
pub struct Removals {
    duration: f32,
    tasks: HashMap<BlockPos, RemovalState>,
}

impl Removals {
    /// `duration_secs <= 0` completes a removal on the next tick.
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration: duration_secs.max(0.0),
            tasks: HashMap::new(),
        }
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn state(&self, pos: BlockPos) -> RemovalState {
        self.tasks.get(&pos).copied().unwrap_or(RemovalState::Idle)
    }

    /// Idle -> Removing(0). Returns false if `pos` already has a task.
    pub fn start(&mut self, pos: BlockPos) -> bool {
        if self.tasks.contains_key(&pos) {
            return false;
        }
        self.tasks.insert(pos, RemovalState::Removing { progress: 0.0 });
        log::debug!(target: "removal", "start {pos}");
        true
    }

    /// Advance every running task by `dt` seconds. Tasks that reach the end
    /// move to `Done` and are returned in position order.
    pub fn tick(&mut self, dt: f32) -> Vec<BlockPos> {
        let step = if self.duration > 0.0 {
            dt.max(0.0) / self.duration
        } else {
            1.0
        };
        let mut done = Vec::new();
        for (pos, state) in self.tasks.iter_mut() {
            if let RemovalState::Removing { progress } = state {
                let next = *progress + step;
                if next >= 1.0 {
                    *state = RemovalState::Done;
                    done.push(*pos);
                } else {
                    *progress = next;
                }
            }
        }
        done.sort_unstable();
        done
    }

    /// Running tasks and their progress.
    pub fn in_progress(&self) -> impl Iterator<Item = (BlockPos, f32)> + '_ {
        self.tasks.iter().filter_map(|(p, s)| match s {
            RemovalState::Removing { progress } => Some((*p, *progress)),
            _ => None,
        })
    }

    /// Forget a finished task; `pos` is Idle again.
    pub fn finish(&mut self, pos: BlockPos) {
        if matches!(self.tasks.get(&pos), Some(RemovalState::Done)) {
            self.tasks.remove(&pos);
        }
    }

    pub fn cancel(&mut self, pos: BlockPos) -> bool {
        let cancelled = self.tasks.remove(&pos).is_some();
        if cancelled {
            log::debug!(target: "removal", "cancel {pos}");
        }
        cancelled
    }

    /// Drop tasks whose block is gone. Returns how many were cancelled.
    pub fn retain_existing(&mut self, mut exists: impl FnMut(BlockPos) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|p, _| exists(*p));
        let n = before - self.tasks.len();
        if n > 0 {
            log::debug!(target: "removal", "cancelled {n} removals of vanished blocks");
        }
        n
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_accumulates_then_done() {
        let mut r = Removals::new(0.25);
        let p = BlockPos::new(1, 2, 3);
        assert_eq!(r.state(p), RemovalState::Idle);
        assert!(r.start(p));
        assert!(!r.start(p));
        assert!(r.tick(0.1).is_empty());
        match r.state(p) {
            RemovalState::Removing { progress } => assert!((progress - 0.4).abs() < 1e-5),
            other => panic!("unexpected {other:?}"),
        }
        assert!(r.tick(0.1).is_empty());
        assert_eq!(r.tick(0.1), vec![p]);
        assert_eq!(r.state(p), RemovalState::Done);
        // Done tasks do not fire again
        assert!(r.tick(1.0).is_empty());
        r.finish(p);
        assert_eq!(r.state(p), RemovalState::Idle);
    }

    #[test]
    fn zero_duration_is_immediate() {
        let mut r = Removals::new(0.0);
        let p = BlockPos::new(0, 0, 0);
        r.start(p);
        assert_eq!(r.tick(0.0), vec![p]);
    }

    #[test]
    fn concurrent_tasks_are_independent() {
        let mut r = Removals::new(1.0);
        let a = BlockPos::new(0, 0, 0);
        let b = BlockPos::new(5, 0, 0);
        r.start(a);
        r.tick(0.6);
        r.start(b);
        assert_eq!(r.tick(0.5), vec![a]);
        assert_eq!(r.in_progress().collect::<Vec<_>>(), vec![(b, 0.5)]);
        assert_eq!(r.retain_existing(|p| p != b), 1);
        assert_eq!(r.state(b), RemovalState::Idle);
        assert!(r.cancel(a));
        assert!(r.is_empty());
    }
}
