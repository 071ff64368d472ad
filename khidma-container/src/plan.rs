//! Injection plans: compiled, reusable dependency assignment.
//!
//! A consumer type declares its injectable members once through
//! [`Injectable::declare`]. [`compile_plan`] turns that declaration into
//! an [`InjectionPlan`]: an ordered list of "resolve contract X, hand it
//! to member Y" steps that is cached by the registry and replayed for
//! every instance of the type.
//!
//! # Execution order
//! Fields are injected in declaration order, then the entry point (if
//! any) is called with its parameters resolved left to right.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use khidma_container::plan::{Injectable, PlanBuilder, compile_plan};
//!
//! trait Clock: Send + Sync {}
//! trait Logger: Send + Sync {}
//!
//! #[derive(Default)]
//! struct Scheduler {
//!     clock: Option<Arc<dyn Clock>>,
//!     logger: Option<Arc<dyn Logger>>,
//! }
//!
//! impl Scheduler {
//!     fn inject(&mut self, logger: Arc<dyn Logger>) {
//!         self.logger = Some(logger);
//!     }
//! }
//!
//! impl Injectable for Scheduler {
//!     fn declare(plan: &mut PlanBuilder<Self>) {
//!         plan.field::<dyn Clock>("clock", |this, clock| this.clock = Some(clock));
//!         plan.entry_point("inject", Scheduler::inject);
//!     }
//! }
//!
//! let plan = compile_plan::<Scheduler>();
//! assert_eq!(plan.dependencies().len(), 2);
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::ResolutionContext;
use crate::error::{AmbiguousCastError, KhidmaError, Result};
use crate::key::ContractKey;
use crate::registry::Resolver;

/// A type whose dependencies the container can inject.
///
/// The default declaration is empty, which compiles to a no-op plan.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Declares injectable fields and the entry point.
    ///
    /// Called once per type when its plan is compiled.
    fn declare(plan: &mut PlanBuilder<Self>) {
        let _ = plan;
    }
}

type FieldFn = Box<dyn Fn(&mut dyn Any, &dyn Resolver, &ResolutionContext) -> Result<()> + Send + Sync>;
type EntryFn = Box<dyn Fn(&mut dyn Any, &mut Arguments<'_>) -> Result<()> + Send + Sync>;

struct FieldStep {
    member: &'static str,
    contract: ContractKey,
    apply: FieldFn,
}

struct EntryStep {
    member: &'static str,
    parameters: Vec<ContractKey>,
    invoke: EntryFn,
}

/// Collects the steps of an [`InjectionPlan`] for `T`.
pub struct PlanBuilder<T> {
    fields: Vec<FieldStep>,
    entry: Option<EntryStep>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: Injectable> PlanBuilder<T> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            entry: None,
            _marker: PhantomData,
        }
    }

    /// Declares an injectable field holding a `C`.
    ///
    /// `assign` stores the resolved instance, typically
    /// `|this, value| this.field = Some(value)`.
    pub fn field<C>(&mut self, member: &'static str, assign: fn(&mut T, Arc<C>)) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let apply = move |target: &mut dyn Any, resolver: &dyn Resolver, ctx: &ResolutionContext| {
            let value = crate::container::resolve::<C>(resolver, ctx)?;
            assign(downcast_target::<T>(target)?, value);
            Ok(())
        };

        self.fields.push(FieldStep {
            member,
            contract: ContractKey::of::<C>(),
            apply: Box::new(apply),
        });
        self
    }

    /// Declares the entry point: a method whose parameters are all
    /// `Arc<Contract>` values.
    ///
    /// A type has at most one entry point; declaring another replaces it.
    pub fn entry_point<M, E>(&mut self, member: &'static str, entry: E) -> &mut Self
    where
        E: EntryPoint<T, M>,
    {
        if let Some(previous) = &self.entry {
            warn!(
                consumer = type_name::<T>(),
                previous = previous.member,
                replacement = member,
                "Only one injection entry point is allowed, replacing the previous one"
            );
        }

        let parameters = entry.parameters();
        let invoke = move |target: &mut dyn Any, args: &mut Arguments<'_>| {
            entry.invoke(downcast_target::<T>(target)?, args)
        };

        self.entry = Some(EntryStep {
            member,
            parameters,
            invoke: Box::new(invoke),
        });
        self
    }
}

fn downcast_target<T: 'static>(target: &mut dyn Any) -> Result<&mut T> {
    target.downcast_mut::<T>().ok_or_else(|| {
        KhidmaError::AmbiguousCast(AmbiguousCastError {
            expected: type_name::<T>(),
            actual: None,
        })
    })
}

/// Resolves entry point parameters on demand, in call order.
pub struct Arguments<'a> {
    resolver: &'a dyn Resolver,
    context: &'a ResolutionContext,
}

impl Arguments<'_> {
    /// Resolves the next parameter.
    pub fn next<C: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<C>> {
        crate::container::resolve::<C>(self.resolver, self.context)
    }
}

/// A method usable as an injection entry point.
///
/// Implemented for every `Fn(&mut T, Arc<A>, Arc<B>, ...)` with up to
/// eight parameters; `M` only disambiguates the arity.
pub trait EntryPoint<T, M>: Send + Sync + 'static {
    /// The contracts resolved for each parameter, in order.
    fn parameters(&self) -> Vec<ContractKey>;

    fn invoke(&self, target: &mut T, args: &mut Arguments<'_>) -> Result<()>;
}

macro_rules! impl_entry_point {
    ($($param:ident),*) => {
        impl<T, F, $($param),*> EntryPoint<T, fn($(Arc<$param>),*)> for F
        where
            F: Fn(&mut T $(, Arc<$param>)*) + Send + Sync + 'static,
            $($param: ?Sized + Send + Sync + 'static,)*
        {
            fn parameters(&self) -> Vec<ContractKey> {
                vec![$(ContractKey::of::<$param>()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn invoke(&self, target: &mut T, args: &mut Arguments<'_>) -> Result<()> {
                $(let $param = args.next::<$param>()?;)*
                self(target $(, $param)*);
                Ok(())
            }
        }
    };
}

impl_entry_point!();
impl_entry_point!(A1);
impl_entry_point!(A1, A2);
impl_entry_point!(A1, A2, A3);
impl_entry_point!(A1, A2, A3, A4);
impl_entry_point!(A1, A2, A3, A4, A5);
impl_entry_point!(A1, A2, A3, A4, A5, A6);
impl_entry_point!(A1, A2, A3, A4, A5, A6, A7);
impl_entry_point!(A1, A2, A3, A4, A5, A6, A7, A8);

/// A compiled injection procedure for one consumer type.
pub struct InjectionPlan {
    consumer: ContractKey,
    fields: Vec<FieldStep>,
    entry: Option<EntryStep>,
}

impl InjectionPlan {
    /// A plan that injects nothing.
    pub fn noop(consumer: ContractKey) -> Self {
        Self {
            consumer,
            fields: Vec::new(),
            entry: None,
        }
    }

    pub fn consumer(&self) -> ContractKey {
        self.consumer
    }

    pub fn is_noop(&self) -> bool {
        self.fields.is_empty() && self.entry.is_none()
    }

    /// Every contract this plan resolves, fields first.
    pub fn dependencies(&self) -> Vec<ContractKey> {
        let mut deps: Vec<ContractKey> = self.fields.iter().map(|f| f.contract).collect();
        if let Some(entry) = &self.entry {
            deps.extend(entry.parameters.iter().copied());
        }
        deps
    }

    /// Runs the plan against `target`.
    ///
    /// Stops at the first failing step; members already assigned keep
    /// their values.
    pub fn execute(
        &self,
        target: &mut dyn Any,
        resolver: &dyn Resolver,
        ctx: &ResolutionContext,
    ) -> Result<()> {
        let ctx = ctx.for_consumer(self.consumer);

        for field in &self.fields {
            (field.apply)(target, resolver, &ctx)?;
        }

        if let Some(entry) = &self.entry {
            let mut args = Arguments {
                resolver,
                context: &ctx,
            };
            (entry.invoke)(target, &mut args)?;
        }

        Ok(())
    }
}

impl fmt::Debug for InjectionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<(&str, &ContractKey)> =
            self.fields.iter().map(|s| (s.member, &s.contract)).collect();
        f.debug_struct("InjectionPlan")
            .field("consumer", &self.consumer)
            .field("fields", &fields)
            .field("entry", &self.entry.as_ref().map(|e| (e.member, &e.parameters)))
            .finish()
    }
}

/// Compiles the plan for `T` from its [`Injectable`] declaration.
pub fn compile_plan<T: Injectable>() -> InjectionPlan {
    let mut builder = PlanBuilder::<T>::new();
    T::declare(&mut builder);

    let plan = InjectionPlan {
        consumer: ContractKey::of::<T>(),
        fields: builder.fields,
        entry: builder.entry,
    };

    debug!(
        consumer = %plan.consumer,
        fields = plan.fields.len(),
        entry_point = plan.entry.as_ref().map(|e| e.member),
        "Compiled injection plan"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Instance;
    use crate::error::UnknownServiceError;
    use parking_lot::Mutex;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct FixedClock(u64);
    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    /// Serves `dyn Clock` and `u32`, and records every request.
    #[derive(Default)]
    struct RecordingResolver {
        requests: Mutex<Vec<ContractKey>>,
    }

    impl Resolver for RecordingResolver {
        fn resolve_key(&self, key: &ContractKey, _ctx: &ResolutionContext) -> Result<Instance> {
            self.requests.lock().push(*key);
            if *key == ContractKey::of::<dyn Clock>() {
                let clock: Arc<dyn Clock> = Arc::new(FixedClock(42));
                return Ok(Arc::new(clock));
            }
            if *key == ContractKey::of::<u32>() {
                return Ok(Arc::new(Arc::new(7u32)));
            }
            Err(KhidmaError::UnknownService(UnknownServiceError {
                requested: *key,
                required_by: None,
                suggestions: vec![],
            }))
        }
    }

    #[derive(Default)]
    struct Consumer {
        clock: Option<Arc<dyn Clock>>,
        number: Option<Arc<u32>>,
        seen_at_entry: Option<(bool, bool)>,
    }

    impl Consumer {
        fn inject(&mut self, number: Arc<u32>) {
            self.seen_at_entry = Some((self.clock.is_some(), self.number.is_some()));
            self.number = Some(number);
        }
    }

    impl Injectable for Consumer {
        fn declare(plan: &mut PlanBuilder<Self>) {
            plan.field::<dyn Clock>("clock", |this, clock| this.clock = Some(clock));
            plan.entry_point("inject", Consumer::inject);
        }
    }

    struct Plain;
    impl Injectable for Plain {}

    #[test]
    fn empty_declaration_is_noop() {
        let plan = compile_plan::<Plain>();
        assert!(plan.is_noop());
        assert!(plan.dependencies().is_empty());
    }

    #[test]
    fn dependencies_fields_then_entry() {
        let plan = compile_plan::<Consumer>();
        assert_eq!(
            plan.dependencies(),
            vec![ContractKey::of::<dyn Clock>(), ContractKey::of::<u32>()]
        );
    }

    #[test]
    fn fields_run_before_entry_point() {
        let plan = compile_plan::<Consumer>();
        let resolver = RecordingResolver::default();
        let mut consumer = Consumer::default();

        plan.execute(&mut consumer, &resolver, &ResolutionContext::global())
            .unwrap();

        assert_eq!(consumer.seen_at_entry, Some((true, false)));
        assert_eq!(consumer.clock.unwrap().now(), 42);
        assert_eq!(*consumer.number.unwrap(), 7);
        assert_eq!(
            *resolver.requests.lock(),
            vec![ContractKey::of::<dyn Clock>(), ContractKey::of::<u32>()]
        );
    }

    #[test]
    fn failing_step_reports_consumer() {
        #[derive(Default)]
        struct NeedsString {
            text: Option<Arc<String>>,
        }
        impl Injectable for NeedsString {
            fn declare(plan: &mut PlanBuilder<Self>) {
                plan.field::<String>("text", |this, text| this.text = Some(text));
            }
        }

        let plan = compile_plan::<NeedsString>();
        let mut target = NeedsString::default();
        let err = plan
            .execute(&mut target, &RecordingResolver::default(), &ResolutionContext::global())
            .unwrap_err();
        assert!(matches!(err, KhidmaError::UnknownService(_)));
        assert!(target.text.is_none());
    }

    #[test]
    fn wrong_target_type_is_ambiguous_cast() {
        let plan = compile_plan::<Consumer>();
        let mut wrong = Plain;
        let err = plan
            .execute(&mut wrong, &RecordingResolver::default(), &ResolutionContext::global())
            .unwrap_err();
        assert!(matches!(err, KhidmaError::AmbiguousCast(_)));
    }

    #[test]
    fn second_entry_point_replaces_first() {
        #[derive(Default)]
        struct Twice {
            calls: Vec<&'static str>,
        }
        impl Twice {
            fn first(&mut self) {
                self.calls.push("first");
            }
            fn second(&mut self, _clock: Arc<dyn Clock>) {
                self.calls.push("second");
            }
        }
        impl Injectable for Twice {
            fn declare(plan: &mut PlanBuilder<Self>) {
                plan.entry_point("first", Twice::first);
                plan.entry_point("second", Twice::second);
            }
        }

        let plan = compile_plan::<Twice>();
        let mut target = Twice::default();
        plan.execute(&mut target, &RecordingResolver::default(), &ResolutionContext::global())
            .unwrap();
        assert_eq!(target.calls, vec!["second"]);
    }
}
