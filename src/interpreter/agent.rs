use crate::ast::Program;
use crate::interpreter::completion::Completion;
use crate::interpreter::environment::{Environment, EnvRef};
use crate::interpreter::features::{FeatureSet, UnknownFeature};
use crate::interpreter::module::ModuleRecord;
use crate::interpreter::object::{
    JsObjectData, ObjRef, ObjectKind, PromiseCapability, PromiseReaction, ReactionKind,
};
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::{Intrinsic, Realm};
use crate::parser;
use crate::types::{JsString, JsSymbol, JsValue};
use log::debug;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::rc::Rc;

/// Host hook: resolve `specifier` imported from `referrer` (None for
/// dynamic import from script code) to a module record. Must return the
/// same module for the same pair; the loader memoises per record, which
/// enforces idempotence.
pub type ModuleResolver =
    Rc<dyn Fn(&mut Agent, Option<usize>, &str) -> Result<usize, JsValue>>;

#[derive(Clone, Debug)]
pub enum ScriptOrModule {
    Script(String),
    Module(usize),
}

/// Execution context (§9.4). The stack is LIFO; the top entry is the
/// running context. Every push is paired with a pop on all exit paths.
pub struct ExecutionContext {
    pub function: Option<JsValue>,
    pub realm: usize,
    pub lexical_env: EnvRef,
    pub variable_env: EnvRef,
    pub script_or_module: Option<ScriptOrModule>,
    /// Whether the running code is strict mode code.
    pub strict: bool,
}

/// A pending job and the realm it must run under.
pub struct Job {
    pub realm: usize,
    pub kind: JobKind,
}

pub enum JobKind {
    PromiseReaction {
        reaction: PromiseReaction,
        argument: JsValue,
    },
    PromiseResolveThenable {
        promise: u64,
        thenable: JsValue,
        then: JsValue,
    },
    DynamicImport {
        referrer: Option<usize>,
        specifier: String,
        capability: PromiseCapability,
    },
}

/// Replay state for the running generator/async body: suspension points
/// are numbered dynamically; the body re-executes from the top and
/// consumes recorded resume values until it reaches `target`.
pub struct GeneratorContext {
    pub counter: usize,
    pub target: usize,
    pub resume: Vec<JsValue>,
    pub inject: Option<(usize, Completion)>,
}

/// Well-known symbols (§6.1.5.1), created once per agent with fixed ids.
pub struct WellKnownSymbols {
    pub iterator: JsSymbol,
    pub async_iterator: JsSymbol,
    pub to_primitive: JsSymbol,
    pub to_string_tag: JsSymbol,
    pub has_instance: JsSymbol,
    pub species: JsSymbol,
    pub unscopables: JsSymbol,
    pub is_concat_spreadable: JsSymbol,
}

impl WellKnownSymbols {
    fn new() -> (WellKnownSymbols, u64) {
        let mut next = 0u64;
        let mut well_known = |name: &str| {
            next += 1;
            JsSymbol {
                id: next,
                description: Some(JsString::from_str(name)),
            }
        };
        let symbols = WellKnownSymbols {
            iterator: well_known("Symbol.iterator"),
            async_iterator: well_known("Symbol.asyncIterator"),
            to_primitive: well_known("Symbol.toPrimitive"),
            to_string_tag: well_known("Symbol.toStringTag"),
            has_instance: well_known("Symbol.hasInstance"),
            species: well_known("Symbol.species"),
            unscopables: well_known("Symbol.unscopables"),
            is_concat_spreadable: well_known("Symbol.isConcatSpreadable"),
        };
        (symbols, next + 1)
    }
}

#[derive(Clone, Debug, Default)]
pub struct AgentOptions {
    pub features: Vec<String>,
}

/// The agent: object heap, realm table, execution-context stack, job
/// queue, and process-wide registries. One per logical execution; all
/// public entry points live here.
pub struct Agent {
    pub(crate) objects: Vec<Option<ObjRef>>,
    pub(crate) free_slots: Vec<usize>,
    pub(crate) gc_allocs: usize,
    pub(crate) realms: Vec<Realm>,
    pub(crate) contexts: Vec<ExecutionContext>,
    pub(crate) jobs: VecDeque<Job>,
    pub(crate) features: FeatureSet,
    pub(crate) symbol_registry: FxHashMap<String, JsSymbol>,
    pub(crate) next_symbol_id: u64,
    pub well_known: WellKnownSymbols,
    pub(crate) modules: Vec<ModuleRecord>,
    pub(crate) generator_ctx: Option<GeneratorContext>,
    /// new.target for the innermost native constructor invocation.
    pub(crate) native_new_target: Option<JsValue>,
    /// The this produced by the most recent super() call, read back by
    /// the construct protocol after the function context pops.
    pub(crate) last_constructed_this: Option<JsValue>,
    /// Abrupt completion to inject at a generator's paused suspension
    /// point on the next resume.
    pub(crate) pending_inject: Option<(usize, Completion)>,
    /// Extra GC roots for values held only by Rust frames.
    pub(crate) gc_roots: Vec<JsValue>,
}

impl Agent {
    pub fn new(options: AgentOptions) -> Result<Agent, UnknownFeature> {
        let features = FeatureSet::from_names(&options.features)?;
        let (well_known, next_symbol_id) = WellKnownSymbols::new();
        Ok(Agent {
            objects: Vec::new(),
            free_slots: Vec::new(),
            gc_allocs: 0,
            realms: Vec::new(),
            contexts: Vec::new(),
            jobs: VecDeque::new(),
            features,
            symbol_registry: FxHashMap::default(),
            next_symbol_id,
            well_known,
            modules: Vec::new(),
            generator_ctx: None,
            native_new_target: None,
            last_constructed_this: None,
            pending_inject: None,
            gc_roots: Vec::new(),
        })
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    // ── heap ──────────────────────────────────────────────────────────

    pub fn get_object(&self, id: u64) -> Option<ObjRef> {
        self.objects.get(id as usize).and_then(|slot| slot.clone())
    }

    pub fn allocate_object(&mut self, kind: ObjectKind, realm: usize) -> u64 {
        self.allocate(JsObjectData::new(kind, realm))
    }

    /// An ordinary object with %Object.prototype%.
    pub fn create_ordinary_object(&mut self, realm: usize) -> u64 {
        let proto = self.intrinsic(realm, Intrinsic::ObjectPrototype);
        self.object_create(proto.object_id(), realm)
    }

    /// OrdinaryObjectCreate with an explicit prototype.
    pub fn object_create(&mut self, proto: Option<u64>, realm: usize) -> u64 {
        let id = self.allocate_object(ObjectKind::Ordinary, realm);
        if let Some(proto_id) = proto {
            let proto_ref = self.get_object(proto_id);
            self.get_object(id).unwrap().borrow_mut().prototype = proto_ref;
        }
        id
    }

    // ── realms ────────────────────────────────────────────────────────

    /// CreateRealm + SetRealmGlobalObject + SetDefaultGlobalBindings.
    pub fn create_realm(&mut self, resolver: Option<ModuleResolver>) -> usize {
        let id = self.realms.len();
        debug!("creating realm {id}");

        // The global object exists before the intrinsics; its prototype
        // is patched once %Object.prototype% is built.
        let global_object = self.allocate_object(ObjectKind::Ordinary, id);
        let global_env = Environment::new_global(global_object);
        self.realms.push(Realm {
            id,
            intrinsics: vec![JsValue::Undefined; Intrinsic::COUNT],
            global_object,
            global_env,
            template_cache: FxHashMap::default(),
            resolver,
        });
        crate::interpreter::builtins::create_intrinsics(self, id);
        crate::interpreter::builtins::install_global_bindings(self, id);
        id
    }

    /// The realm of the running execution context; outside any context,
    /// the most recently created realm.
    pub fn current_realm(&self) -> usize {
        self.contexts
            .last()
            .map(|c| c.realm)
            .unwrap_or_else(|| self.realms.len().saturating_sub(1))
    }

    pub fn global(&self, realm: usize) -> JsValue {
        JsValue::object(self.realms[realm].global_object)
    }

    // ── execution contexts ───────────────────────────────────────────

    pub fn push_context(&mut self, context: ExecutionContext) {
        self.contexts.push(context);
    }

    pub fn pop_context(&mut self) {
        self.contexts.pop().expect("context stack underflow");
    }

    pub fn running_context(&self) -> &ExecutionContext {
        self.contexts.last().expect("no running context")
    }

    pub fn lexical_env(&self) -> EnvRef {
        self.running_context().lexical_env.clone()
    }

    pub fn set_lexical_env(&mut self, env: EnvRef) {
        self.contexts
            .last_mut()
            .expect("no running context")
            .lexical_env = env;
    }

    pub fn context_depth(&self) -> usize {
        self.contexts.len()
    }

    // ── symbols ──────────────────────────────────────────────────────

    pub fn new_symbol(&mut self, description: Option<JsString>) -> JsSymbol {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        JsSymbol { id, description }
    }

    /// Symbol.for: one shared symbol per registry key, agent-wide.
    pub fn symbol_for(&mut self, key: &str) -> JsSymbol {
        if let Some(sym) = self.symbol_registry.get(key) {
            return sym.clone();
        }
        let sym = self.new_symbol(Some(JsString::from_str(key)));
        self.symbol_registry.insert(key.to_string(), sym.clone());
        sym
    }

    pub fn symbol_key_for(&self, symbol: &JsSymbol) -> Option<String> {
        self.symbol_registry
            .iter()
            .find(|(_, s)| s.id == symbol.id)
            .map(|(k, _)| k.clone())
    }

    // ── errors ───────────────────────────────────────────────────────

    pub(crate) fn create_error(&mut self, proto: Intrinsic, message: &str) -> JsValue {
        let realm = self.current_realm();
        let proto_id = self.intrinsic(realm, proto).object_id();
        let id = self.object_create(proto_id, realm);
        let obj = self.get_object(id).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "Error";
        data.define(
            PropertyKey::from_str("message"),
            PropertyDescriptor::data(
                JsValue::String(JsString::from_str(message)),
                true,
                false,
                true,
            ),
        );
        drop(data);
        JsValue::object(id)
    }

    pub fn type_error(&mut self, message: &str) -> JsValue {
        self.create_error(Intrinsic::TypeErrorPrototype, message)
    }

    pub fn range_error(&mut self, message: &str) -> JsValue {
        self.create_error(Intrinsic::RangeErrorPrototype, message)
    }

    pub fn reference_error(&mut self, message: &str) -> JsValue {
        self.create_error(Intrinsic::ReferenceErrorPrototype, message)
    }

    pub fn syntax_error(&mut self, message: &str) -> JsValue {
        self.create_error(Intrinsic::SyntaxErrorPrototype, message)
    }

    pub fn uri_error(&mut self, message: &str) -> JsValue {
        self.create_error(Intrinsic::UriErrorPrototype, message)
    }

    /// Embedder helper: construct and return (not throw) an error value.
    pub fn throw_error(&mut self, realm: usize, kind: &str, message: &str) -> JsValue {
        let saved = self.contexts.is_empty();
        if saved {
            // Error creation reads the current realm off the stack.
            let env = self.realms[realm].global_env.clone();
            self.push_context(ExecutionContext {
                function: None,
                realm,
                lexical_env: env.clone(),
                variable_env: env,
                script_or_module: None,
                strict: false,
            });
        }
        let error = match kind {
            "TypeError" => self.type_error(message),
            "RangeError" => self.range_error(message),
            "ReferenceError" => self.reference_error(message),
            "SyntaxError" => self.syntax_error(message),
            "URIError" => self.uri_error(message),
            _ => self.create_error(Intrinsic::ErrorPrototype, message),
        };
        if saved {
            self.pop_context();
        }
        error
    }

    // ── jobs (§4.9) ──────────────────────────────────────────────────

    pub fn enqueue_job(&mut self, realm: usize, kind: JobKind) {
        self.jobs.push_back(Job { realm, kind });
    }

    /// Drain the job queue FIFO. Each job runs under its recorded realm
    /// in a fresh execution context; jobs may enqueue further jobs.
    pub fn run_jobs(&mut self) {
        while let Some(job) = self.jobs.pop_front() {
            let env = self.realms[job.realm].global_env.clone();
            self.push_context(ExecutionContext {
                function: None,
                realm: job.realm,
                lexical_env: env.clone(),
                variable_env: env,
                script_or_module: None,
                strict: false,
            });
            self.run_job(job.kind);
            self.pop_context();
        }
    }

    fn run_job(&mut self, kind: JobKind) {
        match kind {
            JobKind::PromiseReaction { reaction, argument } => {
                self.run_promise_reaction(reaction, argument);
            }
            JobKind::PromiseResolveThenable {
                promise,
                thenable,
                then,
            } => {
                let (resolve, reject) = self.create_resolving_functions(promise);
                let result = self.call(&then, &thenable, &[resolve, reject.clone()]);
                if let Err(error) = result {
                    let _ = self.call(&reject, &JsValue::Undefined, &[error]);
                }
            }
            JobKind::DynamicImport {
                referrer,
                specifier,
                capability,
            } => {
                self.run_dynamic_import_job(referrer, &specifier, capability);
            }
        }
    }

    fn run_promise_reaction(&mut self, reaction: PromiseReaction, argument: JsValue) {
        let handler_result = match &reaction.handler {
            None => match reaction.kind {
                ReactionKind::Fulfill => Ok(argument),
                ReactionKind::Reject => Err(argument),
            },
            Some(handler) => self.call(&handler.clone(), &JsValue::Undefined, &[argument]),
        };
        let Some(capability) = reaction.capability else {
            if let Err(error) = handler_result {
                debug!("unhandled error in capability-less reaction: {error}");
            }
            return;
        };
        let result = match handler_result {
            Ok(value) => self.call(&capability.resolve, &JsValue::Undefined, &[value]),
            Err(error) => self.call(&capability.reject, &JsValue::Undefined, &[error]),
        };
        if let Err(error) = result {
            debug!("promise capability settle failed: {error}");
        }
    }

    // ── script evaluation (§6 embedder API) ──────────────────────────

    /// Parse and run `source` as a script in `realm`. The completion is
    /// the script's; the job queue drains before returning when this is
    /// the outermost evaluation.
    pub fn evaluate_script(&mut self, realm: usize, source: &str, specifier: &str) -> Completion {
        let options = self.features.parser_options();
        let program = match parser::parse_script(source, options) {
            Ok(p) => p,
            Err(e) => {
                let env = self.realms[realm].global_env.clone();
                self.push_context(ExecutionContext {
                    function: None,
                    realm,
                    lexical_env: env.clone(),
                    variable_env: env,
                    script_or_module: None,
                    strict: false,
                });
                let error = self.syntax_error(&e.to_string());
                self.pop_context();
                return Completion::Throw(error);
            }
        };
        self.run_parsed_script(realm, &program, specifier)
    }

    pub(crate) fn run_parsed_script(
        &mut self,
        realm: usize,
        program: &Program,
        specifier: &str,
    ) -> Completion {
        let global_env = self.realms[realm].global_env.clone();
        self.push_context(ExecutionContext {
            function: None,
            realm,
            lexical_env: global_env.clone(),
            variable_env: global_env.clone(),
            script_or_module: Some(ScriptOrModule::Script(specifier.to_string())),
            strict: program.strict,
        });
        let depth = self.context_depth();
        let result = self.script_evaluation(program, &global_env);
        debug_assert_eq!(self.context_depth(), depth, "context stack imbalance");
        self.pop_context();

        if self.contexts.is_empty() {
            self.run_jobs();
        }
        self.maybe_gc();
        result
    }

    // ── small conveniences for embedders and tests ───────────────────

    /// Get a named property of a value (through ToObject semantics for
    /// primitives).
    pub fn get_value_of(&mut self, value: &JsValue, name: &str) -> Result<JsValue, JsValue> {
        self.get_v(value, &PropertyKey::from_str(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_feature_rejected() {
        let result = Agent::new(AgentOptions {
            features: vec!["warp-drive".into()],
        });
        assert!(result.is_err());
    }

    #[test]
    fn symbol_registry_is_shared() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let a = agent.symbol_for("app.key");
        let b = agent.symbol_for("app.key");
        assert_eq!(a, b);
        assert_eq!(agent.symbol_key_for(&a).as_deref(), Some("app.key"));
        let c = agent.new_symbol(None);
        assert_ne!(a, c);
    }

    #[test]
    fn job_queue_is_fifo() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        // Two scripts' worth of reactions: resolved promises run their
        // callbacks in registration order.
        let completion = agent.evaluate_script(
            realm,
            "var order = [];\n\
             Promise.resolve(1).then(function () { order.push('a'); });\n\
             Promise.resolve(2).then(function () { order.push('b'); });\n\
             order.length;",
            "test.js",
        );
        // Jobs run after the script completes; the script itself saw 0.
        assert!(matches!(completion, Completion::Normal(JsValue::Number(n)) if n == 0.0));
        let order = agent
            .evaluate_script(realm, "order.join(',')", "check.js")
            .clone();
        match order {
            Completion::Normal(JsValue::String(s)) => assert_eq!(s.to_rust_string(), "a,b"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
