#[cfg(test)]
mod utils;

#[cfg(test)]
mod resolution {
    mod integration;
}
