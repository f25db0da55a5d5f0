//! Call-order addressed state for views.
//!
//! Every hook category keeps its own cursor. A view must call the same hooks
//! in the same order on every render of a given target; the n-th
//! `use_state` call always reads the n-th state cell.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::runtime::RuntimeHandle;
use crate::{TargetId, ViewId};

trait DepValue {
    fn same(&self, other: &dyn Any) -> bool;
    fn as_any(&self) -> &dyn Any;
}

struct ValueDep<T>(T);

impl<T: PartialEq + 'static> DepValue for ValueDep<T> {
    fn same(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<ValueDep<T>>()
            .is_some_and(|other| other.0 == self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct IdentityDep<T: ?Sized>(Rc<T>);

impl<T: ?Sized + 'static> DepValue for IdentityDep<T> {
    fn same(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<IdentityDep<T>>()
            .is_some_and(|other| Rc::ptr_eq(&other.0, &self.0))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One entry of an effect or memo dependency list.
#[derive(Clone)]
pub struct Dep(Rc<dyn DepValue>);

impl Dep {
    /// Compared by value.
    pub fn new<T: PartialEq + 'static>(value: T) -> Self {
        Dep(Rc::new(ValueDep(value)))
    }

    /// Compared by pointer identity of the shared allocation.
    pub fn by_ref<T: ?Sized + 'static>(value: &Rc<T>) -> Self {
        Dep(Rc::new(IdentityDep(Rc::clone(value))))
    }

    pub fn same(&self, other: &Dep) -> bool {
        self.0.same(other.0.as_any())
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dep(..)")
    }
}

#[derive(Clone, Debug)]
pub enum Deps {
    /// Re-run on every render.
    Always,
    List(Vec<Dep>),
}

impl Deps {
    /// Empty list: run once, on first render.
    pub fn once() -> Self {
        Deps::List(Vec::new())
    }

    fn changed_since(&self, previous: Option<&[Dep]>) -> bool {
        match (self, previous) {
            (Deps::Always, _) | (Deps::List(_), None) => true,
            (Deps::List(current), Some(previous)) => {
                current.len() != previous.len()
                    || current.iter().zip(previous).any(|(a, b)| !a.same(b))
            }
        }
    }

    fn into_recorded(self) -> Option<Vec<Dep>> {
        match self {
            Deps::Always => None,
            Deps::List(deps) => Some(deps),
        }
    }
}

/// Builds a [`Deps::List`]; every value is compared by `PartialEq`.
///
/// ```
/// use bublo_core::{deps, Deps};
///
/// let count = 3;
/// assert!(matches!(deps![count, "label"], Deps::List(ref list) if list.len() == 2));
/// assert!(matches!(deps![], Deps::List(ref list) if list.is_empty()));
/// ```
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {
        $crate::Deps::List(::std::vec![$($crate::Dep::new($dep)),*])
    };
}

/// Value returned from an effect body; carries the optional cleanup.
#[derive(Default)]
pub struct EffectResult {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl EffectResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn cleanup(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }
}

impl From<()> for EffectResult {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

#[derive(Default)]
struct EffectCell {
    last_deps: Option<Vec<Dep>>,
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl EffectCell {
    fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            run_guarded("effect cleanup", cleanup);
        }
    }
}

impl Drop for EffectCell {
    fn drop(&mut self) {
        self.run_cleanup();
    }
}

struct MemoCell<T> {
    value: Option<T>,
    deps: Option<Vec<Dep>>,
}

fn run_guarded<R>(what: &str, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            log::error!("{what} panicked: {}", crate::panic_message(&*payload));
            None
        }
    }
}

/// An effect whose dependencies changed during a render, waiting for the
/// render's patch to commit.
pub struct PendingEffect {
    cell: Rc<RefCell<EffectCell>>,
    deps: Deps,
    body: Box<dyn FnOnce() -> EffectResult>,
}

impl PendingEffect {
    /// Runs the previous cleanup, then the body, recording the new deps and
    /// cleanup. Panics in either step are logged and contained.
    pub fn run(self) {
        let previous = self.cell.borrow_mut().cleanup.take();
        if let Some(cleanup) = previous {
            run_guarded("effect cleanup", cleanup);
        }
        let result = run_guarded("effect", self.body);
        let mut cell = self.cell.borrow_mut();
        cell.last_deps = self.deps.into_recorded();
        cell.cleanup = result.and_then(|result| result.cleanup);
    }
}

/// Setter paired with a [`RenderScope::use_state`] value.
pub struct StateSetter<T> {
    cell: Rc<RefCell<T>>,
    runtime: RuntimeHandle,
    target: TargetId,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            runtime: self.runtime.clone(),
            target: self.target,
        }
    }
}

impl<T: PartialEq + 'static> StateSetter<T> {
    /// Stores `value` and requests a re-render, unless it equals the
    /// current value.
    pub fn set(&self, value: T) {
        if *self.cell.borrow() == value {
            return;
        }
        *self.cell.borrow_mut() = value;
        self.runtime.request_rerender(self.target);
    }

    /// Functional form of [`StateSetter::set`]; `f` sees the latest value,
    /// including writes made since the last render.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.cell.borrow());
        self.set(next);
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.borrow().clone()
    }
}

/// Stable mutable cell returned by [`RenderScope::use_ref`]. Writing to it
/// never schedules a render.
pub struct Ref<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Ref<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn replace(&self, value: T) -> T {
        self.inner.replace(value)
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Ref<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookCategory {
    State,
    Effect,
    Memo,
    Ref,
}

impl fmt::Display for HookCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookCategory::State => "state",
            HookCategory::Effect => "effect",
            HookCategory::Memo => "memo",
            HookCategory::Ref => "ref",
        })
    }
}

/// Hook calls per category in one render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HookCounts {
    pub state: usize,
    pub effect: usize,
    pub memo: usize,
    pub reference: usize,
}

impl HookCounts {
    fn get(&self, category: HookCategory) -> usize {
        match category {
            HookCategory::State => self.state,
            HookCategory::Effect => self.effect,
            HookCategory::Memo => self.memo,
            HookCategory::Ref => self.reference,
        }
    }

    fn advance(&mut self, category: HookCategory) -> usize {
        let cursor = match category {
            HookCategory::State => &mut self.state,
            HookCategory::Effect => &mut self.effect,
            HookCategory::Memo => &mut self.memo,
            HookCategory::Ref => &mut self.reference,
        };
        let index = *cursor;
        *cursor += 1;
        index
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookMismatch {
    CountChanged {
        previous: HookCounts,
        current: HookCounts,
    },
    TypeChanged {
        category: HookCategory,
        index: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookOrderError {
    pub view: ViewId,
    pub target: TargetId,
    pub mismatch: HookMismatch,
}

impl fmt::Display for HookOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mismatch {
            HookMismatch::CountChanged { previous, current } => write!(
                f,
                "view {} on target {} changed its hook calls between renders ({previous:?} -> {current:?})",
                self.view, self.target
            ),
            HookMismatch::TypeChanged { category, index } => write!(
                f,
                "view {} on target {}: {category} hook #{index} changed type",
                self.view, self.target
            ),
        }
    }
}

impl std::error::Error for HookOrderError {}

/// Persistent cells of one (view, target) pair.
#[derive(Default)]
pub(crate) struct HookSlots {
    states: Vec<Rc<dyn Any>>,
    effects: Vec<Rc<dyn Any>>,
    memos: Vec<Rc<dyn Any>>,
    refs: Vec<Rc<dyn Any>>,
    counts: Option<HookCounts>,
}

impl HookSlots {
    fn category(&mut self, category: HookCategory) -> &mut Vec<Rc<dyn Any>> {
        match category {
            HookCategory::State => &mut self.states,
            HookCategory::Effect => &mut self.effects,
            HookCategory::Memo => &mut self.memos,
            HookCategory::Ref => &mut self.refs,
        }
    }
}

#[derive(Default)]
pub(crate) struct HookStore {
    slots: HashMap<(ViewId, TargetId), HookSlots>,
}

impl HookStore {
    pub(crate) fn slots_mut(&mut self, view: ViewId, target: TargetId) -> &mut HookSlots {
        self.slots.entry((view, target)).or_default()
    }

    /// Drops one view's cells on `target`, running outstanding cleanups.
    pub(crate) fn discard(&mut self, view: ViewId, target: TargetId) {
        if self.slots.remove(&(view, target)).is_some() {
            log::debug!("discarded hooks of view {view} on target {target}");
        }
    }

    /// Drops every cell held for `target`, running outstanding cleanups.
    pub(crate) fn discard_target(&mut self, target: TargetId) {
        let keys: Vec<(ViewId, TargetId)> = self
            .slots
            .keys()
            .filter(|(_, owner)| *owner == target)
            .copied()
            .collect();
        for (view, target) in keys {
            self.discard(view, target);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Per-render session handed to a view. All hooks live here.
pub struct RenderScope<'a> {
    slots: &'a mut HookSlots,
    runtime: RuntimeHandle,
    view: ViewId,
    target: TargetId,
    strict: bool,
    cursors: HookCounts,
    pending: Vec<PendingEffect>,
    mismatch: Option<HookMismatch>,
}

impl<'a> RenderScope<'a> {
    pub(crate) fn new(
        slots: &'a mut HookSlots,
        runtime: RuntimeHandle,
        view: ViewId,
        target: TargetId,
        strict: bool,
    ) -> Self {
        Self {
            slots,
            runtime,
            view,
            target,
            strict,
            cursors: HookCounts::default(),
            pending: Vec::new(),
            mismatch: None,
        }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn view_id(&self) -> ViewId {
        self.view
    }

    /// Returns the state cell at the current position, creating it with
    /// `init` on first render.
    pub fn use_state<T: PartialEq + Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let cell = self.claim(HookCategory::State, || RefCell::new(init()));
        let value = cell.borrow().clone();
        let setter = StateSetter {
            cell,
            runtime: self.runtime.clone(),
            target: self.target,
        };
        (value, setter)
    }

    /// Schedules `effect` to run after this render commits when `deps`
    /// changed since it last ran.
    pub fn use_effect<R: Into<EffectResult>>(
        &mut self,
        deps: Deps,
        effect: impl FnOnce() -> R + 'static,
    ) {
        let cell = self.claim(HookCategory::Effect, || RefCell::new(EffectCell::default()));
        if deps.changed_since(cell.borrow().last_deps.as_deref()) {
            self.pending.push(PendingEffect {
                cell,
                deps,
                body: Box::new(move || effect().into()),
            });
        }
    }

    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Ref<T> {
        let inner = self.claim(HookCategory::Ref, || RefCell::new(init()));
        Ref { inner }
    }

    /// Returns the cached value, recomputing it when `deps` changed.
    pub fn use_memo<T: Clone + 'static>(&mut self, deps: Deps, factory: impl FnOnce() -> T) -> T {
        let cell = self.claim(HookCategory::Memo, || {
            RefCell::new(MemoCell::<T> {
                value: None,
                deps: None,
            })
        });
        let cached = {
            let memo = cell.borrow();
            match &memo.value {
                Some(value) if !deps.changed_since(memo.deps.as_deref()) => Some(value.clone()),
                _ => None,
            }
        };
        if let Some(value) = cached {
            return value;
        }
        let value = factory();
        let mut memo = cell.borrow_mut();
        memo.value = Some(value.clone());
        memo.deps = deps.into_recorded();
        value
    }

    /// Memoized shared callback; the same `Rc` is returned until `deps`
    /// change.
    pub fn use_callback<F: 'static>(&mut self, deps: Deps, callback: F) -> Rc<F> {
        self.use_memo(deps, move || Rc::new(callback))
    }

    fn claim<V: 'static>(&mut self, category: HookCategory, init: impl FnOnce() -> V) -> Rc<V> {
        let index = self.cursors.advance(category);
        let previous = self.slots.counts.map(|counts| counts.get(category));
        let slots = self.slots.category(category);
        if let Some(existing) = slots.get(index) {
            if let Ok(value) = Rc::clone(existing).downcast::<V>() {
                return value;
            }
            if self.strict {
                self.mismatch
                    .get_or_insert(HookMismatch::TypeChanged { category, index });
                // The render is rejected; stored cells stay as they were.
                return Rc::new(init());
            } else {
                log::warn!(
                    "{category} hook #{index} of view {} changed type; reinitializing",
                    self.view
                );
            }
        } else if self.strict && previous.is_some_and(|count| index >= count) {
            // Past the previous count: `finish` rejects this render.
            return Rc::new(init());
        }
        let value = Rc::new(init());
        let erased: Rc<dyn Any> = value.clone();
        if index < slots.len() {
            slots[index] = erased;
        } else {
            slots.push(erased);
        }
        value
    }

    /// Closes the render, returning the effects to run once the patch has
    /// been applied.
    pub(crate) fn finish(self) -> Result<Vec<PendingEffect>, HookOrderError> {
        let error = |mismatch| HookOrderError {
            view: self.view,
            target: self.target,
            mismatch,
        };
        if let Some(mismatch) = self.mismatch.clone() {
            return Err(error(mismatch));
        }
        match self.slots.counts {
            Some(previous) if self.strict && previous != self.cursors => {
                Err(error(HookMismatch::CountChanged {
                    previous,
                    current: self.cursors,
                }))
            }
            _ => {
                self.slots.counts = Some(self.cursors);
                Ok(self.pending)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
