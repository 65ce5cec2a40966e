//! JNI registration source.
//!
//! The Java class builds `StatsEvent`s itself, so it declares no native
//! methods. Builds that still link a registration hook for the class get an
//! empty method table to register.

use super::AUTOGENERATED_BANNER;

/// JNI registration emitter for the generated Java class.
pub struct JniEmitter<'a> {
    package: &'a str,
    class: &'a str,
}

impl<'a> JniEmitter<'a> {
    pub fn new(package: &'a str, class: &'a str) -> Self {
        Self { package, class }
    }

    /// `register_android_util_StatsLogInternal` for `android.util.StatsLogInternal`.
    pub fn register_function(&self) -> String {
        format!("register_{}_{}", self.package.replace('.', "_"), self.class)
    }

    /// Binary class name, e.g. `android/util/StatsLogInternal`.
    fn class_path(&self) -> String {
        format!("{}/{}", self.package.replace('.', "/"), self.class)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(AUTOGENERATED_BANNER);
        out.push('\n');
        out.push_str("#include \"core_jni_helpers.h\"\n");
        out.push_str("#include \"jni.h\"\n");
        out.push('\n');
        out.push_str("namespace android {\n");
        out.push('\n');

        out.push_str("/*\n");
        out.push_str(" * JNI registration.\n");
        out.push_str(" */\n");
        out.push_str("static const JNINativeMethod gRegisterMethods[] = {\n");
        out.push_str("};\n");
        out.push('\n');

        out.push_str(&format!("int {}(JNIEnv* env) {{\n", self.register_function()));
        out.push_str("    return RegisterMethodsOrDie(\n");
        out.push_str("            env,\n");
        out.push_str(&format!("            \"{}\",\n", self.class_path()));
        out.push_str("            gRegisterMethods, NELEM(gRegisterMethods));\n");
        out.push_str("}\n");
        out.push('\n');
        out.push_str("} // namespace android\n");
        out
    }
}
