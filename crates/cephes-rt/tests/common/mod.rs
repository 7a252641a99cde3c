#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cephes_rt::{DeadHook, Env, ImportLayout, Instantiate, NativeLibrary, RuntimeError, Value};

pub const LISTING: &str = "\
/* cephes/sqrt.c */
double cephes_sqrt(double x);
/* cephes/exp.c */
double cephes_exp(double x);
/* cephes/frexp.c */
double cephes_frexp(double x, int *pw2);
double cephes_ldexp(double x, int pw2);
/* cephes/polevl.c */
double cephes_polevl(double x, double coef[], int N);
/* cephes/isnan.c */
int cephes_isnan(double x);
";

pub const WASM_MAGIC: &[u8] = b"\0asm\x01\0\0\0";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A handful of cephes routines written in Rust, following the native
/// calling convention: pointers are `Value::Int` addresses into the shared
/// region, scratch frames come from the region's stack and errors go
/// through the `mtherr` import.
#[derive(Default)]
pub struct FakeCephes {
    /// Last watermark pushed in before a call.
    pub stack_pointer: Rc<Cell<Option<u32>>>,
    /// Address of the last scratch frame `polevl` used.
    pub last_frame: Rc<Cell<Option<u32>>>,
}

impl FakeCephes {
    /// Writes `name` into the static data above the stack.
    fn intern(env: &mut Env<'_>, name: &str, terminated: bool) -> Result<u32, RuntimeError> {
        let mut bytes = name.as_bytes().to_vec();
        if terminated {
            bytes.push(0);
        }
        let address = if terminated {
            env.memory().stack_max() + 256
        } else {
            env.memory().size() - bytes.len() as u32
        };
        env.memory_mut().write_array(&bytes, address)?;
        Ok(address)
    }

    fn trap(env: &mut Env<'_>, name: &str, code: i32) -> Result<Value, RuntimeError> {
        let address = Self::intern(env, name, true)?;
        Err(env.mtherr(address as i32, code))
    }

    fn polevl(&self, env: &mut Env<'_>, x: f64, coef: u32, n: u32) -> Result<Value, RuntimeError> {
        let frame = env.memory_mut().stack_alloc(8)?;
        self.last_frame.set(Some(frame));
        env.memory_mut().write_f64(frame, 0.0)?;
        for i in 0..=n {
            let acc = env.memory().read_f64(frame)? * x + env.memory().read_f64(coef + 8 * i)?;
            env.memory_mut().write_f64(frame, acc)?;
        }
        Ok(Value::Double(env.memory().read_f64(frame)?))
    }
}

fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let exponent = x.abs().log2().floor() as i32 + 1;
    (x / 2f64.powi(exponent), exponent)
}

impl NativeLibrary for FakeCephes {
    fn exports(&self) -> Vec<String> {
        [
            "_cephes_sqrt",
            "_cephes_exp",
            "_cephes_frexp",
            "_cephes_ldexp",
            "_cephes_polevl",
            "_cephes_isnan",
            "_cephes_broken",
            "_cephes_grow",
            "_cephes_abort",
            "_cephes_memsize",
            "_cephes_unterminated",
            "stackAlloc",
            "stackSave",
            "stackRestore",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn sync_stack_pointer(&mut self, top: u32) {
        self.stack_pointer.set(Some(top));
    }

    fn invoke(&mut self, export: &str, args: &[Value], env: &mut Env<'_>) -> Result<Value, RuntimeError> {
        match export {
            "_cephes_sqrt" => {
                let x = args[0].as_f64();
                if x < 0.0 {
                    return Self::trap(env, "sqrt", 1);
                }
                Ok(Value::Double(x.sqrt()))
            }
            "_cephes_exp" => {
                let x = args[0].as_f64();
                if x > 709.782712893384 {
                    return Self::trap(env, "exp", 3);
                }
                Ok(Value::Double(x.exp()))
            }
            "_cephes_frexp" => {
                let (mantissa, exponent) = frexp(args[0].as_f64());
                env.memory_mut().write_i32(args[1].as_i32() as u32, exponent)?;
                Ok(Value::Double(mantissa))
            }
            "_cephes_ldexp" => Ok(Value::Double(args[0].as_f64() * 2f64.powi(args[1].as_i32()))),
            "_cephes_polevl" => self.polevl(env, args[0].as_f64(), args[1].as_i32() as u32, args[2].as_i32() as u32),
            "_cephes_isnan" => Ok(Value::Int(args[0].as_f64().is_nan() as i32)),
            "_cephes_broken" => Ok(Value::Int(0)),
            "_cephes_grow" => {
                env.memory_mut().grow(1)?;
                Ok(Value::Int(0))
            }
            "_cephes_abort" => Err(env.dead_hook(DeadHook::Abort)),
            "_cephes_memsize" => Err(env.dead_hook(DeadHook::GetTotalMemory)),
            "_cephes_unterminated" => {
                let address = Self::intern(env, "lgam", false)?;
                Err(env.mtherr(address as i32, args[0].as_i32()))
            }
            other => Err(RuntimeError::EntryPointNotFound(other.to_string())),
        }
    }
}

/// Engine that accepts anything starting with the wasm magic and records
/// the imports it was given.
#[derive(Default)]
pub struct FakeEngine {
    pub imports: Rc<RefCell<Option<ImportLayout>>>,
}

impl Instantiate for FakeEngine {
    fn instantiate(&self, artifact: &[u8], imports: &ImportLayout) -> Result<Box<dyn NativeLibrary>, RuntimeError> {
        if !artifact.starts_with(b"\0asm") {
            return Err(RuntimeError::Instantiation("missing wasm magic".to_string()));
        }
        *self.imports.borrow_mut() = Some(imports.clone());
        Ok(Box::new(FakeCephes::default()))
    }
}
