use crate::interpreter::agent::{Agent, JobKind};
use crate::interpreter::environment::{EnvKind, EnvRef};
use crate::interpreter::object::{IteratorData, JsFunction, JsObjectData};
use crate::interpreter::property::PropertyDescriptor;
use crate::types::JsValue;
use log::debug;
use rustc_hash::FxHashSet;

pub(crate) const GC_THRESHOLD: usize = 8192;

/// Mark-and-sweep over the slot heap. Roots: realms, execution
/// contexts, the job queue, module records, and the transient agent
/// registers. Environments are traced through (they are Rc-owned, not
/// heap slots) with a visited set to cut closure cycles.
struct Marker {
    marked: Vec<bool>,
    worklist: Vec<u64>,
    visited_envs: FxHashSet<*const ()>,
}

impl Marker {
    fn mark_value(&mut self, value: &JsValue) {
        if let JsValue::Object(o) = value {
            self.mark_id(o.id);
        }
    }

    fn mark_id(&mut self, id: u64) {
        let index = id as usize;
        if index < self.marked.len() && !self.marked[index] {
            self.marked[index] = true;
            self.worklist.push(id);
        }
    }

    fn mark_descriptor(&mut self, desc: &PropertyDescriptor) {
        if let Some(v) = &desc.value {
            self.mark_value(v);
        }
        if let Some(g) = &desc.get {
            self.mark_value(g);
        }
        if let Some(s) = &desc.set {
            self.mark_value(s);
        }
    }

    fn mark_env(&mut self, env: &EnvRef) {
        let ptr = std::rc::Rc::as_ptr(env) as *const ();
        if !self.visited_envs.insert(ptr) {
            return;
        }
        let e = env.borrow();
        for binding in e.bindings.values() {
            self.mark_value(&binding.value);
        }
        match &e.kind {
            EnvKind::Object { binding_object, .. } | EnvKind::Global { binding_object, .. } => {
                self.mark_id(*binding_object);
            }
            EnvKind::Function {
                this_value,
                function_object,
                new_target,
                ..
            } => {
                self.mark_value(this_value);
                self.mark_id(*function_object);
                self.mark_value(new_target);
            }
            _ => {}
        }
        if let Some(outer) = &e.outer {
            self.mark_env(&outer.clone());
        }
    }

    fn trace(&mut self, data: &JsObjectData) {
        if let Some(proto) = &data.prototype {
            if let Some(id) = proto.borrow().id {
                self.mark_id(id);
            }
        }
        for desc in data.properties.values() {
            self.mark_descriptor(desc);
        }
        if let Some(JsFunction::User(user)) = &data.callable {
            self.mark_env(&user.closure);
            if let Some(home) = user.home_object.get() {
                self.mark_id(home);
            }
        }
        if let Some(primitive) = &data.primitive {
            self.mark_value(primitive);
        }
        if let Some(map) = &data.parameter_map {
            self.mark_env(&map.env);
        }
        if let Some(proxy) = &data.proxy {
            if let Some(t) = proxy.target {
                self.mark_id(t);
            }
            if let Some(h) = proxy.handler {
                self.mark_id(h);
            }
        }
        if let Some(bound) = &data.bound {
            self.mark_id(bound.target);
            self.mark_value(&bound.bound_this);
            for arg in &bound.bound_args {
                self.mark_value(arg);
            }
        }
        match &data.iterator {
            Some(IteratorData::Array { target, .. }) => self.mark_id(*target),
            Some(IteratorData::Generator(gen)) => self.trace_generator(gen),
            Some(IteratorData::AsyncGenerator(agen)) => {
                self.trace_generator(&agen.gen);
                for request in &agen.queue {
                    self.mark_value(&request.capability.promise);
                    self.mark_value(&request.capability.resolve);
                    self.mark_value(&request.capability.reject);
                }
            }
            _ => {}
        }
        if let Some(promise) = &data.promise {
            use crate::interpreter::object::PromiseState;
            match &promise.state {
                PromiseState::Fulfilled(v) | PromiseState::Rejected(v) => self.mark_value(v),
                PromiseState::Pending => {}
            }
            for reaction in promise
                .fulfill_reactions
                .iter()
                .chain(&promise.reject_reactions)
            {
                if let Some(handler) = &reaction.handler {
                    self.mark_value(handler);
                }
                if let Some(capability) = &reaction.capability {
                    self.mark_value(&capability.promise);
                    self.mark_value(&capability.resolve);
                    self.mark_value(&capability.reject);
                }
            }
        }
    }

    fn trace_generator(&mut self, gen: &crate::interpreter::object::GeneratorData) {
        self.mark_env(&gen.function.closure);
        self.mark_id(gen.function_object);
        self.mark_value(&gen.this_value);
        for arg in &gen.args {
            self.mark_value(arg);
        }
        for value in &gen.resume {
            self.mark_value(value);
        }
    }
}

impl Agent {
    pub(crate) fn allocate(&mut self, mut data: JsObjectData) -> u64 {
        self.gc_allocs += 1;
        let id = match self.free_slots.pop() {
            Some(slot) => {
                data.id = Some(slot as u64);
                self.objects[slot] = Some(std::rc::Rc::new(std::cell::RefCell::new(data)));
                slot as u64
            }
            None => {
                let slot = self.objects.len();
                data.id = Some(slot as u64);
                self.objects
                    .push(Some(std::rc::Rc::new(std::cell::RefCell::new(data))));
                slot as u64
            }
        };
        id
    }

    pub(crate) fn maybe_gc(&mut self) {
        if self.gc_allocs < GC_THRESHOLD {
            return;
        }
        // Collection only runs between evaluations; mid-evaluation Rust
        // frames may hold untracked handles.
        if !self.contexts.is_empty() {
            return;
        }
        self.gc_allocs = 0;
        self.collect();
    }

    pub fn collect(&mut self) {
        let mut marker = Marker {
            marked: vec![false; self.objects.len()],
            worklist: Vec::new(),
            visited_envs: FxHashSet::default(),
        };

        for realm in &self.realms {
            marker.mark_id(realm.global_object);
            for intrinsic in &realm.intrinsics {
                marker.mark_value(intrinsic);
            }
            marker.mark_env(&realm.global_env);
            for template in realm.template_cache.values() {
                marker.mark_id(*template);
            }
        }
        for context in &self.contexts {
            if let Some(function) = &context.function {
                marker.mark_value(function);
            }
            marker.mark_env(&context.lexical_env);
            marker.mark_env(&context.variable_env);
        }
        for job in &self.jobs {
            match &job.kind {
                JobKind::PromiseReaction { reaction, argument } => {
                    marker.mark_value(argument);
                    if let Some(handler) = &reaction.handler {
                        marker.mark_value(handler);
                    }
                    if let Some(capability) = &reaction.capability {
                        marker.mark_value(&capability.promise);
                        marker.mark_value(&capability.resolve);
                        marker.mark_value(&capability.reject);
                    }
                }
                JobKind::PromiseResolveThenable {
                    promise,
                    thenable,
                    then,
                } => {
                    marker.mark_id(*promise);
                    marker.mark_value(thenable);
                    marker.mark_value(then);
                }
                JobKind::DynamicImport { capability, .. } => {
                    marker.mark_value(&capability.promise);
                    marker.mark_value(&capability.resolve);
                    marker.mark_value(&capability.reject);
                }
            }
        }
        for module in &self.modules {
            if let Some(env) = &module.environment {
                marker.mark_env(&env.clone());
            }
            if let Some(ns) = module.namespace {
                marker.mark_id(ns);
            }
            if let Some(error) = &module.evaluation_error {
                marker.mark_value(error);
            }
        }
        if let Some(ctx) = &self.generator_ctx {
            for value in &ctx.resume {
                marker.mark_value(value);
            }
        }
        for value in &self.gc_roots {
            marker.mark_value(value);
        }
        if let Some(v) = &self.native_new_target {
            marker.mark_value(v);
        }
        if let Some(v) = &self.last_constructed_this {
            marker.mark_value(v);
        }

        while let Some(id) = marker.worklist.pop() {
            let Some(obj) = self.get_object(id) else {
                continue;
            };
            let data = obj.borrow();
            marker.trace(&data);
        }

        let mut freed = 0usize;
        for (index, slot) in self.objects.iter_mut().enumerate() {
            if slot.is_some() && !marker.marked[index] {
                *slot = None;
                self.free_slots.push(index);
                freed += 1;
            }
        }
        debug!("gc: freed {freed} of {} slots", marker.marked.len());
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    #[test]
    fn collect_frees_garbage_but_keeps_reachable() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(
            realm,
            "var keep = { a: { b: 1 } };\n\
             for (var i = 0; i < 100; i++) { var t = { x: i }; }\n\
             t = null;",
            "gc.js",
        );
        let before = agent.objects.iter().filter(|s| s.is_some()).count();
        agent.collect();
        let after = agent.objects.iter().filter(|s| s.is_some()).count();
        assert!(after < before, "collection should free the loop garbage");

        // The kept graph is still reachable and intact.
        let result = agent.evaluate_script(realm, "keep.a.b", "gc2.js");
        assert!(matches!(result, Completion::Normal(JsValue::Number(n)) if n == 1.0));
    }

    #[test]
    fn closures_keep_environments_alive() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(
            realm,
            "var get;\n\
             (function () { var secret = { n: 7 }; get = function () { return secret.n; }; })();",
            "gc3.js",
        );
        agent.collect();
        let result = agent.evaluate_script(realm, "get()", "gc4.js");
        assert!(matches!(result, Completion::Normal(JsValue::Number(n)) if n == 7.0));
    }
}
