mod integration;
mod secure;
