use std::{cell::{Ref, RefCell, RefMut}, rc::Rc};

const MICRO_IN_SEC: u64 = 1_000_000;

/// Single threaded shared ownership, used where several handles must see the same state
pub type SharableRef<T> = Rc<RefCell<T>>;

pub trait SharableRefExt<T>{
    fn new_sharable(inner: T) -> SharableRef<T>;

    fn deref(&self) -> Ref<T>;

    fn deref_mut(&self) -> RefMut<T>;
}

impl<T> SharableRefExt<T> for SharableRef<T>{
    fn new_sharable(inner: T) -> SharableRef<T>{
        Rc::new(RefCell::new(inner))
    }
    fn deref_mut(&self) -> RefMut<T> {
        self.borrow_mut()
    }
    fn deref(&self) -> Ref<T>{
        self.borrow()
    }
}

/// Transforms microseconds to ticks of a counter running at `tick_hz`
pub fn micro_to_counter(micro_seconds: u64, tick_hz: u64) -> u64 {
    micro_seconds * tick_hz / MICRO_IN_SEC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micro_to_counter_scales_with_tick_rate() {
        assert_eq!(micro_to_counter(30_000, 1_000_000), 30_000);
        assert_eq!(micro_to_counter(30_000, 40_000_000), 1_200_000);
        assert_eq!(micro_to_counter(1, 500_000), 0);
    }

    #[test]
    fn sharable_ref_clones_share_the_value() {
        let original = SharableRef::new_sharable(1_u32);
        let copy = original.clone();
        *copy.deref_mut() += 1;
        assert_eq!(*original.deref(), 2);
    }
}
