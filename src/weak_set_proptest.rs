#![cfg(test)]

// Property tests for WeakSet kept inside the crate, next to the layers
// they exercise.

use crate::WeakSet;
use proptest::prelude::*;
use std::rc::Rc;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// slots, pool size shrinks, and op lists shrink in length. Dropping the
// strong reference in a slot is how the scenario reclaims an element;
// reinserting into an empty slot mints a brand-new allocation, so address
// reuse is exercised naturally.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize),
    Remove(usize),
    DropStrong(usize),
    Contains(usize),
    Iterate,
    Sweep,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<OpI>)> {
    (1usize..=6).prop_flat_map(|pool| {
        let idx = 0..pool;
        let op = prop_oneof![
            4 => idx.clone().prop_map(OpI::Insert),
            2 => idx.clone().prop_map(OpI::Remove),
            3 => idx.clone().prop_map(OpI::DropStrong),
            2 => idx.clone().prop_map(OpI::Contains),
            2 => Just(OpI::Iterate),
            1 => Just(OpI::Sweep),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool, ops))
    })
}

// Property: state-machine equivalence against an order-preserving model.
// The model is the list of pool slots that are currently members and still
// strongly held, in insertion order. Invariants exercised across random
// operation sequences:
// - Insert is idempotent for a live member and succeeds otherwise.
// - Remove returns true iff the slot was a live member.
// - Dropping the last strong reference removes the element from every
//   observation (len, contains, iteration) without any explicit call.
// - Iteration yields exactly the model's elements, identity-equal and in
//   insertion order, whether or not sweep ever ran.
// - len parity with the model after every operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: WeakSet<u32> = WeakSet::new();
        let mut slots: Vec<Option<Rc<u32>>> = vec![None; pool];
        let mut order: Vec<usize> = Vec::new();

        for op in ops {
            match op {
                OpI::Insert(i) => {
                    if slots[i].is_none() {
                        slots[i] = Some(Rc::new(i as u32));
                    }
                    let rc = slots[i].as_ref().unwrap();
                    let inserted = sut.insert(rc);
                    let member = order.contains(&i);
                    prop_assert_eq!(inserted, !member, "insert must dedup live members");
                    if !member {
                        order.push(i);
                    }
                }
                OpI::Remove(i) => {
                    if let Some(rc) = slots[i].as_ref() {
                        let removed = sut.remove(rc);
                        let member = order.contains(&i);
                        prop_assert_eq!(removed, member, "remove true iff live member");
                        order.retain(|&j| j != i);
                    }
                }
                OpI::DropStrong(i) => {
                    // Reclaims the element unless it was never created; the
                    // set holds only weak handles so membership lapses.
                    slots[i] = None;
                    order.retain(|&j| j != i);
                }
                OpI::Contains(i) => {
                    if let Some(rc) = slots[i].as_ref() {
                        prop_assert_eq!(sut.contains(rc), order.contains(&i));
                    }
                }
                OpI::Iterate => {
                    let got: Vec<Rc<u32>> = sut.iter().collect();
                    prop_assert_eq!(got.len(), order.len());
                    for (v, &i) in got.iter().zip(order.iter()) {
                        let expect = slots[i].as_ref().expect("model members are held");
                        prop_assert!(Rc::ptr_eq(v, expect), "order must match insertion");
                    }
                }
                OpI::Sweep => {
                    let _ = sut.sweep();
                }
                OpI::Clear => {
                    sut.clear();
                    order.clear();
                }
            }

            // Post-conditions after each op
            prop_assert_eq!(sut.len(), order.len());
            prop_assert_eq!(sut.is_empty(), order.is_empty());
            for (i, slot) in slots.iter().enumerate() {
                if let Some(rc) = slot {
                    prop_assert_eq!(sut.contains(rc), order.contains(&i));
                }
            }
        }
    }
}

// Property: after a full traversal, all stale bookkeeping is gone: the
// registry holds exactly one subscription per live member and a follow-up
// sweep finds nothing. Exercises the "destroyed together by whichever
// cleanup path fires first" contract from the other direction.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_traversal_then_sweep_is_noop(live in 0usize..12, dead in 0usize..12) {
        let sut: WeakSet<u32> = WeakSet::new();
        let held: Vec<Rc<u32>> = (0..live as u32).map(Rc::new).collect();
        for rc in &held {
            sut.insert(rc);
        }
        for n in 0..dead as u32 {
            let rc = Rc::new(1000 + n);
            sut.insert(&rc);
            // rc drops here: entry goes stale immediately
        }

        let seen = sut.iter().count();
        prop_assert_eq!(seen, live);
        prop_assert_eq!(sut.sweep(), 0, "traversal already pruned everything");
        prop_assert_eq!(sut.len(), live);
    }
}
