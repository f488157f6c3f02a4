/// Guard that runs a closure when dropped.
pub struct Defer<F>
where
    F: FnOnce(),
{
    action: Option<F>,
}

impl<F> Defer<F>
where
    F: FnOnce(),
{
    /// Drops the guard without running its closure.
    pub fn disarm(mut self) {
        self.action = None;
    }
}

impl<F> Drop for Defer<F>
where
    F: FnOnce(),
{
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

/// Runs `f` when the returned guard goes out of scope.
pub fn defer<F>(f: F) -> Defer<F>
where
    F: FnOnce(),
{
    Defer { action: Some(f) }
}

/// Runs the given statements at the end of the enclosing scope.
#[macro_export]
macro_rules! defer {
    ($e:expr) => {
        let _defer = $crate::defer(|| $e);
    };
    ($($data: tt)*) => {
        $crate::defer!({ $($data)* });
    };
}
