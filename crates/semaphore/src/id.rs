use crate::SemaphoreError;

/// A parsed semaphore id: `"name"` (size 1), `"name:N"`, or `":N"` (anonymous, size `N`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemaphoreId {
    pub name: String,
    pub size: usize,
}

impl SemaphoreId {
    pub fn parse(raw: &str) -> Result<Self, SemaphoreError> {
        match raw.split_once(':') {
            None => Ok(SemaphoreId { name: raw.to_string(), size: 1 }),
            Some((name, size_str)) => {
                let size: usize = size_str
                    .parse()
                    .map_err(|_| SemaphoreError::InvalidId(raw.to_string()))?;
                if size == 0 {
                    return Err(SemaphoreError::InvalidId(raw.to_string()));
                }
                Ok(SemaphoreId { name: name.to_string(), size })
            }
        }
    }
}
