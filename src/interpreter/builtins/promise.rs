use super::{create_constructor, define_method, define_to_string_tag};
use crate::interpreter::agent::{Agent, JobKind};
use crate::interpreter::completion::{Completion, SuspendKind};
use crate::interpreter::object::{
    AsyncGeneratorRequest, GeneratorData, GeneratorState, IteratorData, ObjectKind,
    PromiseCapability, PromiseData, PromiseReaction, PromiseState, ReactionKind, UserFunction,
};
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::JsValue;
use std::cell::Cell;
use std::rc::Rc;

// ── the promise abstract machinery (§27.2.1) ─────────────────────────

impl Agent {
    pub fn create_promise_object(&mut self) -> u64 {
        let realm = self.current_realm();
        let proto = self.intrinsic(realm, Intrinsic::PromisePrototype);
        let id = self.object_create(proto.object_id(), realm);
        let obj = self.get_object(id).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "Promise";
        data.promise = Some(PromiseData::new());
        id
    }

    /// CreateResolvingFunctions: resolve/reject pair sharing an
    /// already-resolved latch.
    pub fn create_resolving_functions(&mut self, promise: u64) -> (JsValue, JsValue) {
        let already = Rc::new(Cell::new(false));
        let already_for_reject = already.clone();

        let resolve = self.create_native_function("", 1, false, move |agent, _this, args| {
            if already.get() {
                return Ok(JsValue::Undefined);
            }
            already.set(true);
            let resolution = args.first().cloned().unwrap_or(JsValue::Undefined);
            agent.resolve_promise_with(promise, resolution);
            Ok(JsValue::Undefined)
        });
        let reject = self.create_native_function("", 1, false, move |agent, _this, args| {
            if already_for_reject.get() {
                return Ok(JsValue::Undefined);
            }
            already_for_reject.set(true);
            let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
            agent.reject_promise(promise, reason);
            Ok(JsValue::Undefined)
        });
        (resolve, reject)
    }

    /// The resolve function's body: self-resolution rejects, thenables
    /// defer through a job, everything else fulfils.
    pub(crate) fn resolve_promise_with(&mut self, promise: u64, resolution: JsValue) {
        if resolution.object_id() == Some(promise) {
            let error = self.type_error("Chaining cycle detected for promise");
            self.reject_promise(promise, error);
            return;
        }
        if !resolution.is_object() {
            self.fulfill_promise(promise, resolution);
            return;
        }
        let then = match self.get_v(&resolution, &PropertyKey::from_str("then")) {
            Ok(v) => v,
            Err(error) => {
                self.reject_promise(promise, error);
                return;
            }
        };
        if !self.is_callable(&then) {
            self.fulfill_promise(promise, resolution);
            return;
        }
        let realm = self.current_realm();
        self.enqueue_job(
            realm,
            JobKind::PromiseResolveThenable {
                promise,
                thenable: resolution,
                then,
            },
        );
    }

    pub fn fulfill_promise(&mut self, promise: u64, value: JsValue) {
        let reactions = {
            let obj = self.get_object(promise).unwrap();
            let mut data = obj.borrow_mut();
            let Some(p) = data.promise.as_mut() else {
                return;
            };
            if !matches!(p.state, PromiseState::Pending) {
                return;
            }
            p.state = PromiseState::Fulfilled(value.clone());
            p.reject_reactions.clear();
            std::mem::take(&mut p.fulfill_reactions)
        };
        let realm = self.current_realm();
        for reaction in reactions {
            self.enqueue_job(
                realm,
                JobKind::PromiseReaction {
                    reaction,
                    argument: value.clone(),
                },
            );
        }
    }

    pub fn reject_promise(&mut self, promise: u64, reason: JsValue) {
        let reactions = {
            let obj = self.get_object(promise).unwrap();
            let mut data = obj.borrow_mut();
            let Some(p) = data.promise.as_mut() else {
                return;
            };
            if !matches!(p.state, PromiseState::Pending) {
                return;
            }
            p.state = PromiseState::Rejected(reason.clone());
            p.fulfill_reactions.clear();
            std::mem::take(&mut p.reject_reactions)
        };
        let realm = self.current_realm();
        for reaction in reactions {
            self.enqueue_job(
                realm,
                JobKind::PromiseReaction {
                    reaction,
                    argument: reason.clone(),
                },
            );
        }
    }

    /// NewPromiseCapability against the realm's own %Promise%.
    pub fn new_promise_capability_default(&mut self) -> Result<PromiseCapability, JsValue> {
        let promise = self.create_promise_object();
        let (resolve, reject) = self.create_resolving_functions(promise);
        Ok(PromiseCapability {
            promise: JsValue::object(promise),
            resolve,
            reject,
        })
    }

    /// NewPromiseCapability (§27.2.1.5) for an arbitrary constructor.
    pub fn new_promise_capability(
        &mut self,
        constructor: &JsValue,
    ) -> Result<PromiseCapability, JsValue> {
        let realm = self.current_realm();
        if constructor.object_id() == self.intrinsic(realm, Intrinsic::PromiseConstructor).object_id()
        {
            return self.new_promise_capability_default();
        }
        if !self.is_constructor(constructor) {
            return Err(self.type_error("Promise capability requires a constructor"));
        }
        let slots: Rc<std::cell::RefCell<(Option<JsValue>, Option<JsValue>)>> =
            Rc::new(std::cell::RefCell::new((None, None)));
        let slots_for_executor = slots.clone();
        let executor = self.create_native_function("", 2, false, move |agent, _this, args| {
            let mut captured = slots_for_executor.borrow_mut();
            if captured.0.is_some() || captured.1.is_some() {
                return Err(agent.type_error("Promise executor has already been invoked"));
            }
            captured.0 = Some(args.first().cloned().unwrap_or(JsValue::Undefined));
            captured.1 = Some(args.get(1).cloned().unwrap_or(JsValue::Undefined));
            Ok(JsValue::Undefined)
        });
        let promise = self.construct(constructor, &[executor], constructor)?;
        let (resolve, reject) = {
            let captured = slots.borrow();
            (
                captured.0.clone().unwrap_or(JsValue::Undefined),
                captured.1.clone().unwrap_or(JsValue::Undefined),
            )
        };
        if !self.is_callable(&resolve) || !self.is_callable(&reject) {
            return Err(self.type_error("Promise resolve/reject functions are not callable"));
        }
        Ok(PromiseCapability {
            promise,
            resolve,
            reject,
        })
    }

    /// PromiseResolve (§27.2.4.7.1).
    pub fn promise_resolve_value(&mut self, value: &JsValue) -> Result<JsValue, JsValue> {
        if let Some(id) = value.object_id() {
            let is_promise = self
                .get_object(id)
                .is_some_and(|o| o.borrow().promise.is_some());
            if is_promise {
                return Ok(value.clone());
            }
        }
        let capability = self.new_promise_capability_default()?;
        self.call(&capability.resolve, &JsValue::Undefined, &[value.clone()])?;
        Ok(capability.promise)
    }

    /// PerformPromiseThen (§27.2.5.4.1). `capability` is None for the
    /// engine-internal reactions that drive async resumption.
    pub fn perform_promise_then(
        &mut self,
        promise: u64,
        on_fulfilled: Option<JsValue>,
        on_rejected: Option<JsValue>,
        capability: Option<PromiseCapability>,
    ) -> JsValue {
        let fulfill_reaction = PromiseReaction {
            capability: capability.clone(),
            kind: ReactionKind::Fulfill,
            handler: on_fulfilled,
        };
        let reject_reaction = PromiseReaction {
            capability: capability.clone(),
            kind: ReactionKind::Reject,
            handler: on_rejected,
        };
        let pending_state = {
            let obj = self.get_object(promise).unwrap();
            let data = obj.borrow();
            data.promise.as_ref().map(|p| p.state.clone())
        };
        match pending_state {
            Some(PromiseState::Pending) => {
                let obj = self.get_object(promise).unwrap();
                let mut data = obj.borrow_mut();
                let p = data.promise.as_mut().unwrap();
                p.fulfill_reactions.push(fulfill_reaction);
                p.reject_reactions.push(reject_reaction);
                p.handled = true;
            }
            Some(PromiseState::Fulfilled(value)) => {
                let realm = self.current_realm();
                self.enqueue_job(
                    realm,
                    JobKind::PromiseReaction {
                        reaction: fulfill_reaction,
                        argument: value,
                    },
                );
            }
            Some(PromiseState::Rejected(reason)) => {
                {
                    let obj = self.get_object(promise).unwrap();
                    let mut data = obj.borrow_mut();
                    if let Some(p) = data.promise.as_mut() {
                        p.handled = true;
                    }
                }
                let realm = self.current_realm();
                self.enqueue_job(
                    realm,
                    JobKind::PromiseReaction {
                        reaction: reject_reaction,
                        argument: reason,
                    },
                );
            }
            None => {}
        }
        match capability {
            Some(c) => c.promise,
            None => JsValue::Undefined,
        }
    }

    // ── async functions (§27.7 atop the replay driver) ───────────────

    /// AsyncFunctionStart: run the body until the first await; the
    /// returned promise settles with the body's completion.
    pub(crate) fn async_function_start(
        &mut self,
        func_id: u64,
        user: Rc<UserFunction>,
        this_value: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsValue> {
        let capability = self.new_promise_capability_default()?;
        let bound_this = self.coerce_async_this(&user, this_value)?;
        let state = self.create_async_state(func_id, user, &bound_this, args, &capability);
        self.gc_roots.push(JsValue::object(state));
        self.async_step(state, Completion::Normal(JsValue::Undefined));
        Ok(capability.promise)
    }

    fn coerce_async_this(
        &mut self,
        user: &Rc<UserFunction>,
        this_value: &JsValue,
    ) -> Result<JsValue, JsValue> {
        use crate::interpreter::object::ThisMode;
        match user.this_mode {
            ThisMode::Lexical | ThisMode::Strict => Ok(this_value.clone()),
            ThisMode::Global => {
                if this_value.is_nullish() {
                    Ok(JsValue::object(self.realms[user.realm].global_object))
                } else {
                    Ok(JsValue::object(self.to_object(this_value)?))
                }
            }
        }
    }

    /// The async body's saved state lives in an internal heap object so
    /// the collector can trace it; the capability rides along as
    /// properties.
    fn create_async_state(
        &mut self,
        func_id: u64,
        user: Rc<UserFunction>,
        this_value: &JsValue,
        args: &[JsValue],
        capability: &PromiseCapability,
    ) -> u64 {
        let realm = self.current_realm();
        let id = self.allocate_object(ObjectKind::Ordinary, realm);
        let obj = self.get_object(id).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "AsyncState";
        data.iterator = Some(IteratorData::Generator(GeneratorData {
            function: user,
            function_object: func_id,
            this_value: this_value.clone(),
            args: args.to_vec(),
            state: GeneratorState::SuspendedStart,
            resume: Vec::new(),
        }));
        data.define(
            PropertyKey::from_str("promise"),
            PropertyDescriptor::data_default(capability.promise.clone()),
        );
        data.define(
            PropertyKey::from_str("resolve"),
            PropertyDescriptor::data_default(capability.resolve.clone()),
        );
        data.define(
            PropertyKey::from_str("reject"),
            PropertyDescriptor::data_default(capability.reject.clone()),
        );
        id
    }

    fn async_state_capability(&self, state: u64) -> PromiseCapability {
        let obj = self.get_object(state).unwrap();
        let data = obj.borrow();
        let read = |name: &str| {
            data.properties
                .get(&PropertyKey::from_str(name))
                .and_then(|d| d.value.clone())
                .unwrap_or(JsValue::Undefined)
        };
        PromiseCapability {
            promise: read("promise"),
            resolve: read("resolve"),
            reject: read("reject"),
        }
    }

    /// One resumption step: re-run the body to the next await (or to
    /// completion), then settle or chain.
    fn async_step(&mut self, state: u64, input: Completion) {
        let Some(obj) = self.get_object(state) else {
            return;
        };
        let (user, func_id, this_value, args, gen_state, mut resume) = {
            let mut data = obj.borrow_mut();
            let Some(IteratorData::Generator(gen)) = &mut data.iterator else {
                return;
            };
            (
                gen.function.clone(),
                gen.function_object,
                gen.this_value.clone(),
                gen.args.clone(),
                gen.state,
                gen.resume.clone(),
            )
        };

        let (target, inject) = match gen_state {
            GeneratorState::Completed | GeneratorState::Executing => return,
            GeneratorState::SuspendedStart => (0, None),
            GeneratorState::SuspendedYield(k) => match input {
                Completion::Normal(v) => {
                    resume.push(v);
                    (k + 1, None)
                }
                abrupt => {
                    resume.push(JsValue::Undefined);
                    (k + 1, Some((k, abrupt)))
                }
            },
        };

        let completion =
            self.run_replay(func_id, &user, &this_value, &args, resume.clone(), target, inject);
        let capability = self.async_state_capability(state);
        match completion {
            Completion::Suspend(SuspendKind::Await, awaited) => {
                {
                    let mut data = obj.borrow_mut();
                    if let Some(IteratorData::Generator(gen)) = &mut data.iterator {
                        gen.state = GeneratorState::SuspendedYield(target);
                        gen.resume = resume;
                    }
                }
                let promise = match self.promise_resolve_value(&awaited) {
                    Ok(p) => p,
                    Err(error) => {
                        self.finish_async_state(state, &capability, Err(error));
                        return;
                    }
                };
                let on_fulfilled =
                    self.create_native_function("", 1, false, move |agent, _this, args| {
                        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
                        agent.async_step(state, Completion::Normal(value));
                        Ok(JsValue::Undefined)
                    });
                let on_rejected =
                    self.create_native_function("", 1, false, move |agent, _this, args| {
                        let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
                        agent.async_step(state, Completion::Throw(reason));
                        Ok(JsValue::Undefined)
                    });
                // The promise here is always our own, so it carries the
                // internal promise slot.
                if let Some(promise_id) = promise.object_id() {
                    self.perform_promise_then(
                        promise_id,
                        Some(on_fulfilled),
                        Some(on_rejected),
                        None,
                    );
                }
            }
            Completion::Normal(value) | Completion::Return(value) => {
                self.finish_async_state(state, &capability, Ok(value));
            }
            Completion::Throw(error) => {
                self.finish_async_state(state, &capability, Err(error));
            }
            Completion::Suspend(SuspendKind::Yield, _)
            | Completion::Break(_)
            | Completion::Continue(_) => {
                let error = self.type_error("Invalid suspension in async function body");
                self.finish_async_state(state, &capability, Err(error));
            }
        }
    }

    fn finish_async_state(
        &mut self,
        state: u64,
        capability: &PromiseCapability,
        result: Result<JsValue, JsValue>,
    ) {
        if let Some(obj) = self.get_object(state) {
            let mut data = obj.borrow_mut();
            if let Some(IteratorData::Generator(gen)) = &mut data.iterator {
                gen.state = GeneratorState::Completed;
            }
        }
        self.gc_roots
            .retain(|v| v.object_id() != Some(state));
        let _ = match result {
            Ok(value) => self.call(&capability.resolve.clone(), &JsValue::Undefined, &[value]),
            Err(error) => self.call(&capability.reject.clone(), &JsValue::Undefined, &[error]),
        };
    }

    // ── async generators (minimal queue-driven driver) ───────────────

    pub(crate) fn async_generator_enqueue(
        &mut self,
        this: &JsValue,
        completion: Completion,
    ) -> Result<JsValue, JsValue> {
        let Some(id) = this.object_id() else {
            return Err(self.type_error("AsyncGenerator method called on incompatible receiver"));
        };
        let capability = self.new_promise_capability_default()?;
        {
            let Some(obj) = self.get_object(id) else {
                return Err(self.type_error("stale async generator"));
            };
            let mut data = obj.borrow_mut();
            let Some(IteratorData::AsyncGenerator(agen)) = &mut data.iterator else {
                drop(data);
                return Err(
                    self.type_error("AsyncGenerator method called on incompatible receiver")
                );
            };
            agen.queue.push_back(AsyncGeneratorRequest {
                completion,
                capability: capability.clone(),
            });
            if agen.draining || agen.gen.state == GeneratorState::Executing {
                return Ok(capability.promise);
            }
            agen.draining = true;
        }
        self.drive_async_generator(id);
        Ok(capability.promise)
    }

    fn drive_async_generator(&mut self, id: u64) {
        loop {
            let Some(obj) = self.get_object(id) else { return };
            let (request, user, func_id, this_value, args, gen_state, mut resume) = {
                let mut data = obj.borrow_mut();
                let Some(IteratorData::AsyncGenerator(agen)) = &mut data.iterator else {
                    return;
                };
                let Some(request) = agen.queue.pop_front() else {
                    agen.draining = false;
                    return;
                };
                (
                    request,
                    agen.gen.function.clone(),
                    agen.gen.function_object,
                    agen.gen.this_value.clone(),
                    agen.gen.args.clone(),
                    agen.gen.state,
                    agen.gen.resume.clone(),
                )
            };

            let capability = request.capability.clone();
            let (target, inject) = match gen_state {
                GeneratorState::Completed => {
                    // Settled generator: answer immediately.
                    match request.completion {
                        Completion::Throw(error) => {
                            let _ = self.call(
                                &capability.reject.clone(),
                                &JsValue::Undefined,
                                &[error],
                            );
                        }
                        Completion::Return(value) => {
                            let result = self.create_iter_result_object(value, true);
                            let _ = self.call(
                                &capability.resolve.clone(),
                                &JsValue::Undefined,
                                &[result],
                            );
                        }
                        _ => {
                            let result =
                                self.create_iter_result_object(JsValue::Undefined, true);
                            let _ = self.call(
                                &capability.resolve.clone(),
                                &JsValue::Undefined,
                                &[result],
                            );
                        }
                    }
                    continue;
                }
                GeneratorState::Executing => return,
                GeneratorState::SuspendedStart => match &request.completion {
                    Completion::Throw(error) => {
                        self.set_async_generator_state(id, GeneratorState::Completed);
                        let error = error.clone();
                        let _ = self.call(&capability.reject.clone(), &JsValue::Undefined, &[error]);
                        continue;
                    }
                    Completion::Return(value) => {
                        self.set_async_generator_state(id, GeneratorState::Completed);
                        let result = self.create_iter_result_object(value.clone(), true);
                        let _ =
                            self.call(&capability.resolve.clone(), &JsValue::Undefined, &[result]);
                        continue;
                    }
                    _ => (0, None),
                },
                GeneratorState::SuspendedYield(k) => match request.completion.clone() {
                    Completion::Normal(v) => {
                        resume.push(v);
                        (k + 1, None)
                    }
                    abrupt => {
                        resume.push(JsValue::Undefined);
                        (k + 1, Some((k, abrupt)))
                    }
                },
            };

            self.set_async_generator_state(id, GeneratorState::Executing);
            let completion =
                self.run_replay(func_id, &user, &this_value, &args, resume.clone(), target, inject);

            match completion {
                Completion::Suspend(SuspendKind::Yield, value) => {
                    {
                        let mut data = obj.borrow_mut();
                        if let Some(IteratorData::AsyncGenerator(agen)) = &mut data.iterator {
                            agen.gen.state = GeneratorState::SuspendedYield(target);
                            agen.gen.resume = resume;
                        }
                    }
                    let result = self.create_iter_result_object(value, false);
                    let _ = self.call(&capability.resolve.clone(), &JsValue::Undefined, &[result]);
                }
                Completion::Suspend(SuspendKind::Await, awaited) => {
                    // Pause mid-request: the awaited promise's settlement
                    // re-queues this request's continuation.
                    {
                        let mut data = obj.borrow_mut();
                        if let Some(IteratorData::AsyncGenerator(agen)) = &mut data.iterator {
                            agen.gen.state = GeneratorState::SuspendedYield(target);
                            agen.gen.resume = resume;
                            agen.queue.push_front(AsyncGeneratorRequest {
                                completion: Completion::Normal(JsValue::Undefined),
                                capability: capability.clone(),
                            });
                            agen.draining = false;
                        }
                    }
                    let promise = match self.promise_resolve_value(&awaited) {
                        Ok(p) => p,
                        Err(error) => {
                            self.set_async_generator_state(id, GeneratorState::Completed);
                            let _ = self.call(
                                &capability.reject.clone(),
                                &JsValue::Undefined,
                                &[error],
                            );
                            return;
                        }
                    };
                    let on_fulfilled =
                        self.create_native_function("", 1, false, move |agent, _this, args| {
                            let value = args.first().cloned().unwrap_or(JsValue::Undefined);
                            agent.async_generator_await_settled(id, Completion::Normal(value));
                            Ok(JsValue::Undefined)
                        });
                    let on_rejected =
                        self.create_native_function("", 1, false, move |agent, _this, args| {
                            let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
                            agent.async_generator_await_settled(id, Completion::Throw(reason));
                            Ok(JsValue::Undefined)
                        });
                    if let Some(promise_id) = promise.object_id() {
                        self.perform_promise_then(
                            promise_id,
                            Some(on_fulfilled),
                            Some(on_rejected),
                            None,
                        );
                    }
                    return;
                }
                Completion::Normal(_) => {
                    self.set_async_generator_state(id, GeneratorState::Completed);
                    let result = self.create_iter_result_object(JsValue::Undefined, true);
                    let _ = self.call(&capability.resolve.clone(), &JsValue::Undefined, &[result]);
                }
                Completion::Return(value) => {
                    self.set_async_generator_state(id, GeneratorState::Completed);
                    let result = self.create_iter_result_object(value, true);
                    let _ = self.call(&capability.resolve.clone(), &JsValue::Undefined, &[result]);
                }
                Completion::Throw(error) => {
                    self.set_async_generator_state(id, GeneratorState::Completed);
                    let _ = self.call(&capability.reject.clone(), &JsValue::Undefined, &[error]);
                }
                Completion::Break(_) | Completion::Continue(_) => {
                    self.set_async_generator_state(id, GeneratorState::Completed);
                }
            }
        }
    }

    fn async_generator_await_settled(&mut self, id: u64, input: Completion) {
        // The continuation request sits at the queue head; rewrite its
        // completion with the settled value and resume draining.
        {
            let Some(obj) = self.get_object(id) else { return };
            let mut data = obj.borrow_mut();
            let Some(IteratorData::AsyncGenerator(agen)) = &mut data.iterator else {
                return;
            };
            if let Some(front) = agen.queue.front_mut() {
                front.completion = input;
            }
            if agen.draining {
                return;
            }
            agen.draining = true;
        }
        self.drive_async_generator(id);
    }

    fn set_async_generator_state(&self, id: u64, state: GeneratorState) {
        if let Some(obj) = self.get_object(id) {
            let mut data = obj.borrow_mut();
            if let Some(IteratorData::AsyncGenerator(agen)) = &mut data.iterator {
                agen.gen.state = state;
            }
        }
    }
}

// ── the Promise builtin surface (§27.2) ──────────────────────────────

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = super::new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::PromisePrototype, JsValue::object(prototype));
    define_to_string_tag(agent, prototype, "Promise");

    define_method(agent, prototype, "then", 2, |agent, this, args| {
        let Some(promise) = this.object_id() else {
            return Err(agent.type_error("Promise.prototype.then called on non-promise"));
        };
        let is_promise = agent
            .get_object(promise)
            .is_some_and(|o| o.borrow().promise.is_some());
        if !is_promise {
            return Err(agent.type_error("Promise.prototype.then called on non-promise"));
        }
        let ctor = agent.species_constructor(this, Intrinsic::PromiseConstructor)?;
        let capability = agent.new_promise_capability(&ctor)?;
        let on_fulfilled = args.first().filter(|v| agent.is_callable(v)).cloned();
        let on_rejected = args.get(1).filter(|v| agent.is_callable(v)).cloned();
        Ok(agent.perform_promise_then(promise, on_fulfilled, on_rejected, Some(capability)))
    });

    define_method(agent, prototype, "catch", 1, |agent, this, args| {
        let on_rejected = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.invoke(
            this,
            &PropertyKey::from_str("then"),
            &[JsValue::Undefined, on_rejected],
        )
    });

    define_method(agent, prototype, "finally", 1, |agent, this, args| {
        let on_finally = args.first().cloned().unwrap_or(JsValue::Undefined);
        if !agent.is_callable(&on_finally) {
            return agent.invoke(
                this,
                &PropertyKey::from_str("then"),
                &[on_finally.clone(), on_finally],
            );
        }
        let on_finally_fulfill = on_finally.clone();
        let then_finally =
            agent.create_native_function("", 1, false, move |agent, _this, args| {
                let value = args.first().cloned().unwrap_or(JsValue::Undefined);
                let result = agent.call(&on_finally_fulfill, &JsValue::Undefined, &[])?;
                let promise = agent.promise_resolve_value(&result)?;
                let pass_through =
                    agent.create_native_function("", 0, false, move |_agent, _this, _args| {
                        Ok(value.clone())
                    });
                agent.invoke(
                    &promise,
                    &PropertyKey::from_str("then"),
                    &[pass_through],
                )
            });
        let on_finally_reject = on_finally.clone();
        let catch_finally =
            agent.create_native_function("", 1, false, move |agent, _this, args| {
                let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
                let result = agent.call(&on_finally_reject, &JsValue::Undefined, &[])?;
                let promise = agent.promise_resolve_value(&result)?;
                let rethrow =
                    agent.create_native_function("", 0, false, move |_agent, _this, _args| {
                        Err(reason.clone())
                    });
                agent.invoke(&promise, &PropertyKey::from_str("then"), &[rethrow])
            });
        agent.invoke(
            this,
            &PropertyKey::from_str("then"),
            &[then_finally, catch_finally],
        )
    });

    let ctor = create_constructor(agent, "Promise", 1, prototype, |agent, _this, args| {
        if agent.native_new_target.as_ref().is_none_or(|t| t.is_undefined()) {
            return Err(agent.type_error("Promise constructor requires 'new'"));
        }
        let executor = args.first().cloned().unwrap_or(JsValue::Undefined);
        if !agent.is_callable(&executor) {
            return Err(agent.type_error("Promise resolver is not a function"));
        }
        let promise = agent.create_promise_object();
        // Subclass construction: new.target's prototype wins.
        if let Some(new_target) = agent.native_new_target.clone() {
            if new_target.is_object() {
                let proto = agent.get(&new_target, &PropertyKey::from_str("prototype"))?;
                if let Some(proto_id) = proto.object_id() {
                    let proto_ref = agent.get_object(proto_id);
                    if let Some(obj) = agent.get_object(promise) {
                        obj.borrow_mut().prototype = proto_ref;
                    }
                }
            }
        }
        let (resolve, reject) = agent.create_resolving_functions(promise);
        let outcome = agent.call(
            &executor,
            &JsValue::Undefined,
            &[resolve, reject.clone()],
        );
        if let Err(error) = outcome {
            agent.call(&reject, &JsValue::Undefined, &[error])?;
        }
        Ok(JsValue::object(promise))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::PromiseConstructor, JsValue::object(ctor));

    define_method(agent, ctor, "resolve", 1, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.promise_resolve_value(&value)
    });

    define_method(agent, ctor, "reject", 1, |agent, _this, args| {
        let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
        let capability = agent.new_promise_capability_default()?;
        agent.call(&capability.reject, &JsValue::Undefined, &[reason])?;
        Ok(capability.promise)
    });

    define_method(agent, ctor, "all", 1, |agent, _this, args| {
        let iterable = args.first().cloned().unwrap_or(JsValue::Undefined);
        let capability = agent.new_promise_capability_default()?;
        let items = match agent.iterable_to_list(&iterable) {
            Ok(items) => items,
            Err(error) => {
                agent.call(&capability.reject.clone(), &JsValue::Undefined, &[error])?;
                return Ok(capability.promise);
            }
        };
        // The results array lives on the heap (and is rooted by the
        // element closures' reachability through the reactions).
        let realm = agent.current_realm();
        let values = agent.array_create(items.len() as u32, realm);
        agent.gc_roots.push(JsValue::object(values));
        let remaining = Rc::new(Cell::new(items.len()));
        if items.is_empty() {
            agent.gc_roots.retain(|v| v.object_id() != Some(values));
            let result = JsValue::object(values);
            agent.call(&capability.resolve.clone(), &JsValue::Undefined, &[result])?;
            return Ok(capability.promise);
        }
        for (index, item) in items.into_iter().enumerate() {
            let promise = agent.promise_resolve_value(&item)?;
            let remaining_for_element = remaining.clone();
            let capability_for_element = capability.clone();
            let on_fulfilled =
                agent.create_native_function("", 1, false, move |agent, _this, args| {
                    let value = args.first().cloned().unwrap_or(JsValue::Undefined);
                    agent.create_data_property(
                        values,
                        &PropertyKey::from_number(index as f64),
                        value,
                    )?;
                    remaining_for_element.set(remaining_for_element.get() - 1);
                    if remaining_for_element.get() == 0 {
                        agent.gc_roots.retain(|v| v.object_id() != Some(values));
                        let result = JsValue::object(values);
                        agent.call(
                            &capability_for_element.resolve.clone(),
                            &JsValue::Undefined,
                            &[result],
                        )?;
                    }
                    Ok(JsValue::Undefined)
                });
            agent.invoke(
                &promise,
                &PropertyKey::from_str("then"),
                &[on_fulfilled, capability.reject.clone()],
            )?;
        }
        Ok(capability.promise)
    });

    define_method(agent, ctor, "race", 1, |agent, _this, args| {
        let iterable = args.first().cloned().unwrap_or(JsValue::Undefined);
        let capability = agent.new_promise_capability_default()?;
        let items = match agent.iterable_to_list(&iterable) {
            Ok(items) => items,
            Err(error) => {
                agent.call(&capability.reject.clone(), &JsValue::Undefined, &[error])?;
                return Ok(capability.promise);
            }
        };
        for item in items {
            let promise = agent.promise_resolve_value(&item)?;
            agent.invoke(
                &promise,
                &PropertyKey::from_str("then"),
                &[capability.resolve.clone(), capability.reject.clone()],
            )?;
        }
        Ok(capability.promise)
    });

    // Promise[@@species] returns the receiver.
    let species_key = agent.well_known.species.clone();
    let species_getter =
        agent.create_native_function("get [Symbol.species]", 0, false, |_agent, this, _args| {
            Ok(this.clone())
        });
    {
        let obj = agent.get_object(ctor).unwrap();
        obj.borrow_mut().define(
            PropertyKey::Symbol(species_key),
            PropertyDescriptor {
                get: Some(species_getter),
                set: None,
                enumerable: Some(false),
                configurable: Some(true),
                ..Default::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn run(src: &str, check: &str) -> String {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        let first = agent.evaluate_script(realm, src, "promise.js");
        if let Completion::Throw(e) = first {
            panic!("setup threw: {}", agent.inspect(&e));
        }
        match agent.evaluate_script(realm, check, "check.js") {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            Completion::Normal(other) => agent.inspect(&other),
            other => panic!("check failed: {other:?}"),
        }
    }

    #[test]
    fn then_chain_settles_after_drain() {
        let out = run(
            "var result;\n\
             Promise.resolve(1).then(function (x) { return x + 1; }).then(function (x) { result = x * 2; });",
            "String(result)",
        );
        assert_eq!(out, "4");
    }

    #[test]
    fn sync_code_runs_before_reactions() {
        let out = run(
            "var log = [];\n\
             Promise.resolve('reaction').then(function (v) { log.push(v); });\n\
             log.push('sync');",
            "log.join(',')",
        );
        assert_eq!(out, "sync,reaction");
    }

    #[test]
    fn rejection_flows_to_catch() {
        let out = run(
            "var caught;\n\
             new Promise(function (resolve, reject) { reject(new Error('boom')); })\n\
               .catch(function (e) { caught = e.message; });",
            "caught",
        );
        assert_eq!(out, "boom");
    }

    #[test]
    fn executor_throw_rejects() {
        let out = run(
            "var caught;\n\
             new Promise(function () { throw 'direct'; }).catch(function (e) { caught = e; });",
            "caught",
        );
        assert_eq!(out, "direct");
    }

    #[test]
    fn thenable_resolution_is_deferred() {
        let out = run(
            "var log = [];\n\
             var thenable = { then: function (resolve) { log.push('then-called'); resolve('x'); } };\n\
             Promise.resolve().then(function () { return thenable; }).then(function (v) { log.push(v); });\n\
             log.push('sync');",
            "log.join(',')",
        );
        assert_eq!(out, "sync,then-called,x");
    }

    #[test]
    fn promise_all_collects_in_order() {
        let out = run(
            "var result;\n\
             Promise.all([Promise.resolve('a'), 'b', Promise.resolve('c')])\n\
               .then(function (values) { result = values.join(''); });",
            "result",
        );
        assert_eq!(out, "abc");
    }

    #[test]
    fn promise_all_rejects_on_first_failure() {
        let out = run(
            "var result;\n\
             Promise.all([Promise.resolve(1), Promise.reject('bad')])\n\
               .then(function () { result = 'ok'; }, function (e) { result = 'err:' + e; });",
            "result",
        );
        assert_eq!(out, "err:bad");
    }

    #[test]
    fn finally_passes_value_through() {
        let out = run(
            "var log = [];\n\
             Promise.resolve(7)\n\
               .finally(function () { log.push('cleanup'); })\n\
               .then(function (v) { log.push(v); });",
            "log.join(',')",
        );
        assert_eq!(out, "cleanup,7");
    }

    #[test]
    fn async_body_runs_synchronously_until_await() {
        let out = run(
            "var started = false;\n\
             async function f() { started = true; await 0; }\n\
             f();\n\
             var observed_at_call = started;",
            "String(observed_at_call)",
        );
        assert_eq!(out, "true");
    }

    #[test]
    fn async_functions_await_in_order() {
        let out = run(
            "var log = [];\n\
             async function f() {\n\
               var v = await Promise.resolve('awaited');\n\
               log.push(v);\n\
               return 'done';\n\
             }\n\
             f().then(function (r) { log.push(r); });\n\
             log.push('sync');",
            "log.join(',')",
        );
        assert_eq!(out, "sync,awaited,done");
    }

    #[test]
    fn await_of_settled_value_still_defers() {
        let out = run(
            "var log = [];\n\
             (async function () { await 1; log.push('after-await'); })();\n\
             log.push('sync');",
            "log.join(',')",
        );
        assert_eq!(out, "sync,after-await");
    }

    #[test]
    fn async_rejection_is_catchable() {
        let out = run(
            "var result;\n\
             async function f() { await Promise.reject('nope'); return 'unreached'; }\n\
             f().catch(function (e) { result = 'caught:' + e; });",
            "result",
        );
        assert_eq!(out, "caught:nope");
    }

    #[test]
    fn try_catch_around_await() {
        let out = run(
            "var result;\n\
             async function f() {\n\
               try { await Promise.reject('inner'); }\n\
               catch (e) { return 'handled:' + e; }\n\
             }\n\
             f().then(function (r) { result = r; });",
            "result",
        );
        assert_eq!(out, "handled:inner");
    }
}
