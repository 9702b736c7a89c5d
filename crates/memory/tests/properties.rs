//! Property tests for pool invariants.
//!
//! - Zero-size requests never touch the pool
//! - Destructors fire once each, newest first, per scope
//! - A marker taken on a fresh pool restores it exactly
//! - Ending an inner marker leaves the outer scope intact

use std::cell::RefCell;
use std::rc::Rc;

use mem_pool::{Pool, PoolConfig};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategy: operation scripts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Allocate { size: usize, zeroed: bool },
    WithDestructor { size: usize },
    Hook,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..300, any::<bool>()).prop_map(|(size, zeroed)| Op::Allocate { size, zeroed }),
        (1usize..300).prop_map(|size| Op::WithDestructor { size }),
        Just(Op::Hook),
    ]
}

fn small_pool() -> Pool {
    Pool::with_config(PoolConfig::new().with_min_bin_size(128)).unwrap()
}

/// Applies `ops`, tagging every destructor with a sequential id starting at
/// `first_tag`. Returns the tags registered, in registration order.
fn apply(pool: &mut Pool, ops: &[Op], log: &Rc<RefCell<Vec<usize>>>, first_tag: usize) -> Vec<usize> {
    let mut tags = Vec::new();
    for op in ops {
        match *op {
            Op::Allocate { size, zeroed } => {
                pool.allocate(size, zeroed);
            }
            Op::WithDestructor { size } => {
                let tag = first_tag + tags.len();
                let log = Rc::clone(log);
                pool.allocate_with_destructor(size, false, move |_| log.borrow_mut().push(tag));
                tags.push(tag);
            }
            Op::Hook => {
                let tag = first_tag + tags.len();
                let log = Rc::clone(log);
                pool.on_teardown(move || log.borrow_mut().push(tag));
                tags.push(tag);
            }
        }
    }
    tags
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn zero_size_never_creates_a_bin(ops in prop::collection::vec(arb_op(), 0..20), zeroed in any::<bool>()) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pool = small_pool();
        apply(&mut pool, &ops, &log, 0);

        let before = pool.stats();
        prop_assert!(pool.allocate(0, zeroed).is_none());
        let with_dtor = pool.allocate_with_destructor(0, zeroed, |_| {});
        prop_assert!(with_dtor.is_none());
        prop_assert_eq!(pool.stats(), before);
    }

    #[test]
    fn scope_fires_exactly_its_destructors_in_reverse(
        before in prop::collection::vec(arb_op(), 0..15),
        inside in prop::collection::vec(arb_op(), 0..15),
    ) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pool = small_pool();

        let outer_tags = apply(&mut pool, &before, &log, 0);
        let marker = pool.begin_temporary();
        let scoped_tags = apply(&mut pool, &inside, &log, 1000);
        pool.end_temporary(marker).unwrap();

        let expected: Vec<usize> = scoped_tags.iter().rev().copied().collect();
        prop_assert_eq!(&*log.borrow(), &expected);
        prop_assert_eq!(pool.pending_destructors(), outer_tags.len());

        log.borrow_mut().clear();
        pool.destroy();
        let expected: Vec<usize> = outer_tags.iter().rev().copied().collect();
        prop_assert_eq!(&*log.borrow(), &expected);
    }

    #[test]
    fn pristine_marker_restores_fresh_pool(ops in prop::collection::vec(arb_op(), 0..25)) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pool = small_pool();
        let fresh = pool.stats();

        let marker = pool.begin_temporary();
        prop_assert!(marker.is_pristine());
        let tags = apply(&mut pool, &ops, &log, 0);
        pool.end_temporary(marker).unwrap();

        prop_assert_eq!(pool.stats(), fresh);
        prop_assert_eq!(log.borrow().len(), tags.len());
    }

    #[test]
    fn inner_marker_leaves_outer_scope_intact(
        outer_ops in prop::collection::vec(arb_op(), 1..15),
        inner_ops in prop::collection::vec(arb_op(), 0..15),
        size in 1usize..200,
    ) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pool = small_pool();

        let m1 = pool.begin_temporary();
        apply(&mut pool, &outer_ops, &log, 0);
        let witness = pool.allocate_copy(&vec![0x5Au8; size]).unwrap();
        let after_outer = pool.stats();

        let m2 = pool.begin_temporary();
        apply(&mut pool, &inner_ops, &log, 1000);
        pool.end_temporary(m2).unwrap();

        prop_assert_eq!(pool.stats(), after_outer);
        prop_assert_eq!(pool.get(&witness), Some(&vec![0x5Au8; size][..]));

        pool.end_temporary(m1).unwrap();
        prop_assert!(pool.get(&witness).is_none());
        prop_assert_eq!(pool.bin_count(), 0);
    }
}
