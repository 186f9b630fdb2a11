//! Callable naming and uniform invocation.

/// Short name of a callable type, used as the label in log records.
///
/// For a function item this is the function's own name. For a closure it is
/// the name of the function the closure was written in.
pub fn fn_name<F: ?Sized>() -> &'static str {
    short_name(std::any::type_name::<F>())
}

fn short_name(full: &'static str) -> &'static str {
    let mut path = full;
    while let Some(stripped) = path.strip_suffix("::{{closure}}") {
        path = stripped;
    }

    // Last `::` segment outside of generic brackets.
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = path.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    let segment = &path[start..];
    match segment.find('<') {
        Some(0) | None => segment,
        Some(idx) => &segment[..idx],
    }
}

/// A callable that can be invoked with its arguments packed in a tuple.
///
/// Implemented for every `Fn` of up to six arguments, so a wrapper can expose
/// one `call(args)` method regardless of the wrapped callable's arity:
/// `f.invoke(())`, `f.invoke((a,))`, `f.invoke((a, b))`.
pub trait Invoke<Args> {
    type Output;

    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! impl_invoke {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg),*> Invoke<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out,
        {
            type Output = Out;

            #[allow(non_snake_case)]
            fn invoke(&self, ($($arg,)*): ($($arg,)*)) -> Out {
                self($($arg),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(A1);
impl_invoke!(A1, A2);
impl_invoke!(A1, A2, A3);
impl_invoke!(A1, A2, A3, A4);
impl_invoke!(A1, A2, A3, A4, A5);
impl_invoke!(A1, A2, A3, A4, A5, A6);
