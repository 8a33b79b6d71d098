//! Hook Trampoline Synthesizer
//!
//! One `Hook_<key>` function per catalogue row: run the pre chain, call the
//! original unless superseded, run the post chain, then pick the return
//! value. A positional `g_hamCallbacks[]` table maps enum ids to trampolines.

use crate::backend::cpp::{includes, CodeWriter, CppTable};
use crate::frontend::ast::{HamCatalogue, HamReturn, HamSignature};
use crate::middle::ham_types::{param_info, param_names, return_c_type, v8_conversion};

const INCLUDES: &[&str] = &[
    "hook.h",
    "ham_manager.h",
    "ham_callback_helpers.h",
    "../structures/structures.hpp",
    "../node/utils.hpp",
    "extdll.h",
    "<v8.h>",
    "<cstring>",
    "<cstdio>",
];

/// Return-slot and result macros shared by every trampoline
const MACROS: &str = r#"#define PUSH_VOID() \
    HamManager& mgr = HamManager::instance(); \
    mgr.setCurrentResult(HAM_UNSET); \
    hook->setExecuting(true);

#define PUSH_INT() \
    HamManager& mgr = HamManager::instance(); \
    mgr.setCurrentResult(HAM_UNSET); \
    int ret = 0; \
    int origret = 0; \
    hook->setExecuting(true);

#define PUSH_FLOAT() \
    HamManager& mgr = HamManager::instance(); \
    mgr.setCurrentResult(HAM_UNSET); \
    float ret = 0.0f; \
    float origret = 0.0f; \
    hook->setExecuting(true);

#define PUSH_CBASE() \
    HamManager& mgr = HamManager::instance(); \
    mgr.setCurrentResult(HAM_UNSET); \
    void* ret = nullptr; \
    void* origret = nullptr; \
    hook->setExecuting(true);

#define PUSH_STRING() \
    HamManager& mgr = HamManager::instance(); \
    mgr.setCurrentResult(HAM_UNSET); \
    static char retBuffer[256]; \
    const char* ret = ""; \
    const char* origret = ""; \
    hook->setExecuting(true);

#define PUSH_VECTOR() \
    HamManager& mgr = HamManager::instance(); \
    mgr.setCurrentResult(HAM_UNSET); \
    float retVec[3] = {0, 0, 0}; \
    float origVec[3] = {0, 0, 0}; \
    hook->setExecuting(true);

#define POP() \
    hook->setExecuting(false);

#define CHECK_RETURN_INT() \
    if (mgr.getCurrentResult() < HAM_OVERRIDE) { \
        return origret; \
    } \
    { \
        v8::Isolate* isolate = mgr.getIsolate(); \
        if (isolate) { \
            v8::Locker locker(isolate); \
            v8::Isolate::Scope isolateScope(isolate); \
            v8::HandleScope handleScope(isolate); \
            v8::Local<v8::Value> retVal = mgr.getReturnValue(isolate); \
            v8::Local<v8::Context> ctx = isolate->GetCurrentContext(); \
            if (!retVal.IsEmpty() && retVal->IsNumber()) { \
                ret = retVal->Int32Value(ctx).FromMaybe(origret); \
            } else { \
                ret = origret; \
            } \
        } else { \
            ret = origret; \
        } \
    } \
    return ret;

#define CHECK_RETURN_FLOAT() \
    if (mgr.getCurrentResult() < HAM_OVERRIDE) { \
        return origret; \
    } \
    { \
        v8::Isolate* isolate = mgr.getIsolate(); \
        if (isolate) { \
            v8::Locker locker(isolate); \
            v8::Isolate::Scope isolateScope(isolate); \
            v8::HandleScope handleScope(isolate); \
            v8::Local<v8::Value> retVal = mgr.getReturnValue(isolate); \
            v8::Local<v8::Context> ctx = isolate->GetCurrentContext(); \
            if (!retVal.IsEmpty() && retVal->IsNumber()) { \
                ret = static_cast<float>(retVal->NumberValue(ctx).FromMaybe(origret)); \
            } else { \
                ret = origret; \
            } \
        } else { \
            ret = origret; \
        } \
    } \
    return ret;"#;

/// Trampoline symbol for a signature key
pub fn hook_symbol(key: &str) -> String {
    format!("Hook_{}", key)
}

/// One generated trampoline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HamTrampoline {
    pub key: String,
    pub symbol: String,
    pub param_names: Vec<String>,
    pub code: String,
}

fn push_macro(ret: &HamReturn) -> &'static str {
    match ret {
        HamReturn::Int => "PUSH_INT()",
        HamReturn::Float => "PUSH_FLOAT()",
        HamReturn::Entity => "PUSH_CBASE()",
        HamReturn::String => "PUSH_STRING()",
        HamReturn::Vector => "PUSH_VECTOR()",
        HamReturn::Void | HamReturn::Unknown(_) => "PUSH_VOID()",
    }
}

/// Bare `{` scope
fn open_block(w: &mut CodeWriter) {
    w.writeln("{");
    w.indent();
}

/// Pre or post callback chain
fn callback_chain(w: &mut CodeWriter, signature: &HamSignature, names: &[String], pre: bool) {
    let flag = if pre { "true" } else { "false" };
    if signature.params.is_empty() {
        w.writeln(&format!("executeCallbacks(hook, pthis, {});", flag));
        return;
    }

    w.writeln(&format!(
        "// Execute {}-callbacks with parameters",
        if pre { "pre" } else { "post" }
    ));
    open_block(w);
    w.writeln("v8::Isolate* isolate = mgr.getIsolate();");
    w.open("if (isolate)");
    w.writeln("v8::Locker locker(isolate);");
    w.writeln("v8::Isolate::Scope isolateScope(isolate);");
    w.writeln("v8::HandleScope handleScope(isolate);");
    w.blank();
    w.open(&format!("v8::Local<v8::Value> extraArgs[{}] =", signature.params.len()));
    let last = signature.params.len() - 1;
    for (i, (param, name)) in signature.params.iter().zip(names).enumerate() {
        let comma = if i < last { "," } else { "" };
        w.writeln(&format!("{}{}", v8_conversion(param, name), comma));
    }
    w.close("};");
    w.writeln(&format!(
        "executeCallbacksWithArgs(hook, pthis, {}, isolate, extraArgs);",
        flag
    ));
    w.close("}");
    w.close("}");
}

/// Typedef, cast and call of the original function
fn original_call(w: &mut CodeWriter, c_ret: &str, param_types: &[&str], call_args: &[String], capture: bool) {
    w.writeln(&format!(
        "typedef {} (*OrigFunc)({});",
        c_ret,
        param_types.join(", ")
    ));
    w.writeln("OrigFunc orig = reinterpret_cast<OrigFunc>(hook->getOriginalFunction());");
    let call = format!("orig({});", call_args.join(", "));
    if capture {
        w.writeln(&format!("origret = {}", call));
    } else {
        w.writeln(&call);
    }
}

/// Open a scope holding the override value as `retVal`
fn open_override_scope(w: &mut CodeWriter) {
    open_block(w);
    w.writeln("v8::Isolate* isolate = mgr.getIsolate();");
    w.open("if (isolate)");
    w.writeln("v8::Locker locker(isolate);");
    w.writeln("v8::Isolate::Scope isolateScope(isolate);");
    w.writeln("v8::HandleScope handleScope(isolate);");
    w.writeln("v8::Local<v8::Value> retVal = mgr.getReturnValue(isolate);");
}

fn close_override_scope(w: &mut CodeWriter) {
    w.close("}");
    w.close("}");
}

/// Entity, string and vector results have no macro
fn return_tail(w: &mut CodeWriter, ret: &HamReturn) {
    match ret {
        HamReturn::Int => w.writeln("CHECK_RETURN_INT()"),
        HamReturn::Float => w.writeln("CHECK_RETURN_FLOAT()"),
        HamReturn::Entity => {
            w.open("if (mgr.getCurrentResult() < HAM_OVERRIDE)");
            w.writeln("return origret;");
            w.close("}");
            w.writeln("ret = origret;");
            open_override_scope(w);
            w.open("if (!retVal.IsEmpty() && retVal->IsObject())");
            w.writeln("edict_t* ed = (edict_t*)structures::unwrapEntity(isolate, retVal);");
            w.open("if (ed && ed->pvPrivateData)");
            w.writeln("ret = ed->pvPrivateData;");
            w.close("}");
            w.close("}");
            close_override_scope(w);
            w.writeln("return ret;");
        }
        HamReturn::String => {
            w.open("if (mgr.getCurrentResult() < HAM_OVERRIDE)");
            w.writeln("return origret;");
            w.close("}");
            w.writeln("ret = origret;");
            open_override_scope(w);
            w.open("if (!retVal.IsEmpty() && retVal->IsString())");
            w.writeln("v8::String::Utf8Value str(isolate, retVal);");
            w.writeln("snprintf(retBuffer, sizeof(retBuffer), \"%s\", *str ? *str : \"\");");
            w.writeln("ret = retBuffer;");
            w.close("}");
            close_override_scope(w);
            w.writeln("return ret;");
        }
        HamReturn::Vector => {
            w.open("if (mgr.getCurrentResult() < HAM_OVERRIDE)");
            w.writeln("memcpy(out, origVec, sizeof(float) * 3);");
            w.writeln("return;");
            w.close("}");
            w.writeln("memcpy(retVec, origVec, sizeof(float) * 3);");
            open_override_scope(w);
            w.open("if (!retVal.IsEmpty() && retVal->IsArray())");
            w.writeln("utils::js2vect(isolate, v8::Local<v8::Array>::Cast(retVal), retVec);");
            w.close("}");
            close_override_scope(w);
            w.writeln("memcpy(out, retVec, sizeof(float) * 3);");
        }
        HamReturn::Void | HamReturn::Unknown(_) => {}
    }
}

/// Generate the trampoline for one signature row
pub fn trampoline(signature: &HamSignature) -> HamTrampoline {
    let symbol = hook_symbol(&signature.key);
    let names = param_names(&signature.key, &signature.params);
    let c_types: Vec<&str> = signature.params.iter().map(|p| param_info(p).c_type).collect();
    let c_ret = return_c_type(&signature.return_code);
    let is_vector = signature.return_code == HamReturn::Vector;

    let params: String = c_types
        .iter()
        .zip(&names)
        .map(|(ty, name)| format!(", {} {}", ty, name))
        .collect();

    let mut w = CodeWriter::with_unit("    ");

    if is_vector {
        w.writeln("#ifdef _WIN32");
        w.writeln(&format!("void {}(Hook* hook, void* pthis, float* out{}) {{", symbol, params));
        w.writeln("#else");
        w.writeln(&format!("void {}(Hook* hook, float* out, void* pthis{}) {{", symbol, params));
        w.writeln("#endif");
        w.indent();
    } else {
        w.open(&format!("{} {}(Hook* hook, void* pthis{})", c_ret, symbol, params));
    }

    w.writeln(push_macro(&signature.return_code));
    w.blank();
    callback_chain(&mut w, signature, &names, true);
    w.blank();

    w.open("if (mgr.getCurrentResult() < HAM_SUPERCEDE)");
    if is_vector {
        let mut win_types = vec!["void*", "float*"];
        win_types.extend(&c_types);
        let mut win_args = vec!["pthis".to_string(), "origVec".to_string()];
        win_args.extend(names.iter().cloned());

        let mut posix_types = vec!["float*", "void*"];
        posix_types.extend(&c_types);
        let mut posix_args = vec!["origVec".to_string(), "pthis".to_string()];
        posix_args.extend(names.iter().cloned());

        w.writeln("#ifdef _WIN32");
        original_call(&mut w, "void", &win_types, &win_args, false);
        w.writeln("#else");
        original_call(&mut w, "void", &posix_types, &posix_args, false);
        w.writeln("#endif");
    } else {
        let mut types = vec!["void*"];
        types.extend(&c_types);
        let mut args = vec!["pthis".to_string()];
        args.extend(names.iter().cloned());
        original_call(&mut w, c_ret, &types, &args, c_ret != "void");
    }
    w.close("}");
    w.blank();

    callback_chain(&mut w, signature, &names, false);
    w.writeln("POP()");
    return_tail(&mut w, &signature.return_code);
    w.close("}");

    HamTrampoline {
        key: signature.key.clone(),
        symbol,
        param_names: names,
        code: w.finish(),
    }
}

/// `g_hamCallbacks[]`, one entry per enum id
pub fn callback_table(catalogue: &HamCatalogue) -> CppTable {
    let mut table = CppTable::new("void* g_hamCallbacks[]");
    for entry in &catalogue.entries {
        match &entry.signature {
            Some(signature) => table.push_noted(
                format!("reinterpret_cast<void*>({})", hook_symbol(&signature.key)),
                format!("{} {}", entry.id, entry.name),
            ),
            None => table.push_noted("nullptr", format!("{} {} (no signature)", entry.id, entry.name)),
        }
    }
    table
}

/// The whole `ham_callbacks.cpp`
pub fn callbacks_file(catalogue: &HamCatalogue) -> (String, Vec<HamTrampoline>) {
    let trampolines: Vec<HamTrampoline> = catalogue
        .entries
        .iter()
        .filter_map(|entry| entry.signature.as_ref())
        .map(trampoline)
        .collect();

    let mut w = CodeWriter::with_unit("    ");
    includes(&mut w, INCLUDES);
    w.blank();
    w.writeln("extern enginefuncs_t g_engfuncs;");
    w.blank();
    w.writeln("using namespace Ham;");
    w.blank();
    w.write_lines(MACROS);
    w.blank();
    for trampoline in &trampolines {
        w.write_lines(&trampoline.code);
        w.blank();
    }
    w.writeln(&format!("const size_t g_hamCallbackCount = {};", catalogue.entries.len()));
    callback_table(catalogue).render(&mut w);

    (w.finish(), trampolines)
}
