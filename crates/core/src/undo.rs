use std::collections::VecDeque;

pub const DEFAULT_MAX_HISTORY: usize = 100;

/// A change that knows how to take itself back out of `T` and put itself
/// back in.
pub trait Reversible<T: ?Sized> {
    fn undo(&self, target: &T);
    fn redo(&self, target: &T);
}

/// Bounded linear history with a cursor on the last applied command.
///
/// `cursor == None` means everything in the log has been undone (or the log
/// is empty). Pushing while some commands are undone drops them.
#[derive(Debug, Clone)]
pub struct CommandLog<C> {
    commands: VecDeque<C>,
    cursor: Option<usize>,
    max_size: usize,
}

impl<C> CommandLog<C> {
    pub fn new(max_size: usize) -> Self {
        Self {
            commands: VecDeque::new(),
            cursor: None,
            max_size: max_size.max(1),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Record a command that has already been applied.
    pub fn push(&mut self, command: C) {
        match self.cursor {
            None => {
                self.commands.clear();
                self.commands.push_back(command);
                self.cursor = Some(0);
            }
            Some(cursor) => {
                self.commands.truncate(cursor + 1);
                self.commands.push_back(command);
                self.cursor = Some(cursor + 1);
            }
        }
        self.evict();
    }

    fn evict(&mut self) {
        while self.commands.len() > self.max_size {
            self.commands.pop_front();
            self.cursor = match self.cursor {
                Some(0) | None => None,
                Some(cursor) => Some(cursor - 1),
            };
        }
    }

    /// Undo the command under the cursor. Returns whether anything happened.
    pub fn undo<T: ?Sized>(&mut self, target: &T) -> bool
    where
        C: Reversible<T>,
    {
        let Some(cursor) = self.cursor else {
            return false;
        };
        if let Some(command) = self.commands.get(cursor) {
            command.undo(target);
        }
        self.cursor = cursor.checked_sub(1);
        true
    }

    /// Redo the command after the cursor. Returns whether anything happened.
    pub fn redo<T: ?Sized>(&mut self, target: &T) -> bool
    where
        C: Reversible<T>,
    {
        let next = self.cursor.map_or(0, |cursor| cursor + 1);
        let Some(command) = self.commands.get(next) else {
            return false;
        };
        command.redo(target);
        self.cursor = Some(next);
        true
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = None;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |cursor| cursor + 1) < self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }
}

impl<C> Default for CommandLog<C> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Adds its value to the target on redo, subtracts on undo.
    #[derive(Debug)]
    struct Add(i32);

    impl Reversible<RefCell<i32>> for Add {
        fn undo(&self, target: &RefCell<i32>) {
            *target.borrow_mut() -= self.0;
        }

        fn redo(&self, target: &RefCell<i32>) {
            *target.borrow_mut() += self.0;
        }
    }

    fn apply(log: &mut CommandLog<Add>, target: &RefCell<i32>, value: i32) {
        *target.borrow_mut() += value;
        log.push(Add(value));
    }

    #[test]
    fn test_undo_redo() {
        let target = RefCell::new(0);
        let mut log = CommandLog::default();
        apply(&mut log, &target, 1);
        apply(&mut log, &target, 10);

        assert!(log.undo(&target));
        assert_eq!(*target.borrow(), 1);
        assert!(log.undo(&target));
        assert_eq!(*target.borrow(), 0);
        assert!(!log.undo(&target));

        assert!(log.redo(&target));
        assert!(log.redo(&target));
        assert_eq!(*target.borrow(), 11);
        assert!(!log.redo(&target));
    }

    #[test]
    fn test_push_after_undo_drops_redo_tail() {
        let target = RefCell::new(0);
        let mut log = CommandLog::default();
        apply(&mut log, &target, 1);
        apply(&mut log, &target, 2);
        log.undo(&target);

        apply(&mut log, &target, 5);

        assert_eq!(log.len(), 2);
        assert!(!log.can_redo());
        log.undo(&target);
        log.undo(&target);
        assert_eq!(*target.borrow(), 0);
    }

    #[test]
    fn test_push_after_undoing_everything_resets_log() {
        let target = RefCell::new(0);
        let mut log = CommandLog::default();
        apply(&mut log, &target, 1);
        apply(&mut log, &target, 2);
        log.undo(&target);
        log.undo(&target);

        apply(&mut log, &target, 7);

        assert_eq!(log.len(), 1);
        assert_eq!(log.cursor(), Some(0));
    }

    #[test]
    fn test_eviction_keeps_cursor_on_same_command() {
        let target = RefCell::new(0);
        let mut log = CommandLog::new(3);
        for value in 1..=5 {
            apply(&mut log, &target, value);
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.cursor(), Some(2));

        // only 3, 4 and 5 can be taken back
        while log.undo(&target) {}
        assert_eq!(*target.borrow(), 1 + 2);
    }

    #[test]
    fn test_redo_from_fully_undone_replays_first() {
        let target = RefCell::new(0);
        let mut log = CommandLog::default();
        apply(&mut log, &target, 4);
        log.undo(&target);

        assert!(log.can_redo());
        assert!(log.redo(&target));
        assert_eq!(*target.borrow(), 4);
    }

    #[test]
    fn test_clear() {
        let target = RefCell::new(0);
        let mut log = CommandLog::default();
        apply(&mut log, &target, 4);
        log.clear();

        assert!(log.is_empty());
        assert!(!log.can_undo());
        assert!(!log.redo(&target));
    }

    #[test]
    fn test_minimum_size() {
        let log: CommandLog<Add> = CommandLog::new(0);
        assert_eq!(log.max_size(), 1);
    }
}
