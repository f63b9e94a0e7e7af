// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use proptest::prelude::*;

use archicomm::history::{HistoryConfig, HistoryManager};

#[derive(Debug, Clone)]
enum Step {
    Push,
    Undo,
    Redo,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![3 => Just(Step::Push), 2 => Just(Step::Undo), 1 => Just(Step::Redo)]
}

proptest! {
    #[test]
    fn past_never_exceeds_max_depth(max_depth in 0usize..20, steps in prop::collection::vec(step(), 0..200)) {
        let mut history = HistoryManager::new(0u32, HistoryConfig::new(max_depth));
        let mut next = 1u32;
        for step in steps {
            match step {
                Step::Push => {
                    history.push_state(next);
                    next += 1;
                    prop_assert!(!history.can_redo());
                }
                Step::Undo => {
                    let before = history.undo_depth();
                    let moved = history.undo().is_some();
                    prop_assert_eq!(moved, before > 0);
                }
                Step::Redo => {
                    let before = history.redo_depth();
                    let moved = history.redo().is_some();
                    prop_assert_eq!(moved, before > 0);
                }
            }
            prop_assert!(history.undo_depth() <= max_depth);
            prop_assert_eq!(history.can_undo(), history.undo_depth() > 0);
            prop_assert_eq!(history.can_redo(), history.redo_depth() > 0);
        }
    }

    #[test]
    fn undo_then_redo_returns_to_the_same_state(pushes in 1u32..80, undos in 0usize..80) {
        let mut history = HistoryManager::new(0u32, HistoryConfig::default());
        for value in 1..=pushes {
            history.push_state(value);
        }
        let top = **history.present();
        let mut undone = 0;
        for _ in 0..undos {
            if history.undo().is_some() {
                undone += 1;
            }
        }
        for _ in 0..undone {
            prop_assert!(history.redo().is_some());
        }
        prop_assert_eq!(**history.present(), top);
        prop_assert!(!history.can_redo());
    }

    #[test]
    fn pushing_n_states_keeps_min_of_n_and_depth(pushes in 0usize..120, max_depth in 1usize..60) {
        let mut history = HistoryManager::new(0usize, HistoryConfig::new(max_depth));
        for value in 1..=pushes {
            history.push_state(value);
        }
        let mut undone = 0;
        while history.undo().is_some() {
            undone += 1;
        }
        prop_assert_eq!(undone, pushes.min(max_depth));
        prop_assert_eq!(**history.present(), pushes - undone);
    }
}
