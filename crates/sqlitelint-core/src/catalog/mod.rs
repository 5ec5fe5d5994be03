//! Type catalog - known classes and their method signatures

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rule::ResolvedMethod;

pub const TYPE_STRING: &str = "java.lang.String";
const TYPE_OBJECT_ARRAY: &str = "java.lang.Object[]";
const TYPE_STRING_ARRAY: &str = "java.lang.String[]";
const CURSOR: &str = "android.database.Cursor";

const SQLITE_DATABASE: &str = "android.database.sqlite.SQLiteDatabase";
const SQLITE_OPEN_HELPER: &str = "android.database.sqlite.SQLiteOpenHelper";
const SUPPORT_SQLITE_DATABASE: &str = "androidx.sqlite.db.SupportSQLiteDatabase";
const SUPPORT_SQLITE_OPEN_HELPER: &str = "androidx.sqlite.db.SupportSQLiteOpenHelper";

/// Method signature in a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    /// Fully qualified parameter types
    #[serde(default)]
    pub params: Vec<String>,
    /// Fully qualified return type, if it is a class worth tracking
    #[serde(default)]
    pub returns: Option<String>,
}

impl MethodDef {
    pub fn new(name: &str, params: &[&str], returns: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            returns: returns.map(str::to_string),
        }
    }
}

/// Class definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Fully qualified name
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Overloads of `name` in declaration order
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDef> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

/// Catalog of classes the host can resolve calls against
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    /// Qualified name -> ClassDef
    classes: IndexMap<String, ClassDef>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the Android SQLite framework classes
    pub fn android() -> Self {
        let mut catalog = Self::new();
        catalog.add_class(
            ClassDef::new(SQLITE_DATABASE)
                .with_method(MethodDef::new("execSQL", &[TYPE_STRING], None))
                .with_method(MethodDef::new(
                    "execSQL",
                    &[TYPE_STRING, TYPE_OBJECT_ARRAY],
                    None,
                ))
                .with_method(MethodDef::new(
                    "rawQuery",
                    &[TYPE_STRING, TYPE_STRING_ARRAY],
                    Some(CURSOR),
                )),
        );
        catalog.add_class(
            ClassDef::new(SQLITE_OPEN_HELPER)
                .with_method(MethodDef::new(
                    "getWritableDatabase",
                    &[],
                    Some(SQLITE_DATABASE),
                ))
                .with_method(MethodDef::new(
                    "getReadableDatabase",
                    &[],
                    Some(SQLITE_DATABASE),
                )),
        );
        catalog.add_class(
            ClassDef::new(SUPPORT_SQLITE_DATABASE)
                .with_method(MethodDef::new("execSQL", &[TYPE_STRING], None))
                .with_method(MethodDef::new(
                    "execSQL",
                    &[TYPE_STRING, TYPE_OBJECT_ARRAY],
                    None,
                )),
        );
        catalog.add_class(
            ClassDef::new(SUPPORT_SQLITE_OPEN_HELPER)
                .with_method(MethodDef::new(
                    "getWritableDatabase",
                    &[],
                    Some(SUPPORT_SQLITE_DATABASE),
                ))
                .with_method(MethodDef::new(
                    "getReadableDatabase",
                    &[],
                    Some(SUPPORT_SQLITE_DATABASE),
                )),
        );
        catalog
    }

    /// Add a class, merging methods into an existing definition
    pub fn add_class(&mut self, class: ClassDef) {
        match self.classes.get_mut(&class.name) {
            Some(existing) => {
                for method in class.methods {
                    if !existing.methods.contains(&method) {
                        existing.methods.push(method);
                    }
                }
            }
            None => {
                self.classes.insert(class.name.clone(), class);
            }
        }
    }

    pub fn get_class(&self, qualified: &str) -> Option<&ClassDef> {
        self.classes.get(qualified)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    /// Resolve `name` with `arg_count` arguments on `class`.
    ///
    /// When several overloads take the same number of arguments, the
    /// first declared one wins.
    pub fn resolve_method(
        &self,
        class: &str,
        name: &str,
        arg_count: usize,
    ) -> Option<ResolvedMethod> {
        let class_def = self.get_class(class)?;
        let method = class_def
            .overloads(name)
            .find(|m| m.params.len() == arg_count)?;
        Some(ResolvedMethod::new(
            class_def.name.clone(),
            method.name.clone(),
            method.params.iter().cloned(),
        ))
    }

    /// Return type of method `name` on `receiver` (or on any known class),
    /// when all matching declarations agree
    pub fn return_type_of(&self, name: &str, receiver: Option<&str>) -> Option<&str> {
        let mut found: Option<&str> = None;
        let candidates = self
            .classes
            .values()
            .filter(|c| receiver.map_or(true, |r| c.name == r));
        for class in candidates {
            for method in class.methods.iter().filter(|m| m.name == name) {
                let Some(returns) = method.returns.as_deref() else {
                    continue;
                };
                match found {
                    Some(existing) if existing != returns => return None,
                    _ => found = Some(returns),
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exec_sql_by_arity() {
        let catalog = TypeCatalog::android();

        let one = catalog
            .resolve_method(SQLITE_DATABASE, "execSQL", 1)
            .unwrap();
        assert_eq!(one.parameter_types, vec![TYPE_STRING]);

        let two = catalog
            .resolve_method(SQLITE_DATABASE, "execSQL", 2)
            .unwrap();
        assert_eq!(two.parameter_types, vec![TYPE_STRING, TYPE_OBJECT_ARRAY]);

        assert!(catalog.resolve_method(SQLITE_DATABASE, "execSQL", 3).is_none());
        assert!(catalog.resolve_method("com.example.Db", "execSQL", 1).is_none());
    }

    #[test]
    fn test_return_type_of_helper_methods() {
        let catalog = TypeCatalog::android();
        assert_eq!(
            catalog.return_type_of("getWritableDatabase", Some(SQLITE_OPEN_HELPER)),
            Some(SQLITE_DATABASE)
        );
        // Framework and androidx helpers disagree without a receiver
        assert_eq!(catalog.return_type_of("getWritableDatabase", None), None);
        assert_eq!(
            catalog.return_type_of("rawQuery", None),
            Some("android.database.Cursor")
        );
    }

    #[test]
    fn test_return_type_outlives_method_name() {
        let catalog = TypeCatalog::android();
        let returns = {
            let name = String::from("getReadableDatabase");
            catalog.return_type_of(&name, Some(SUPPORT_SQLITE_OPEN_HELPER))
        };
        assert_eq!(returns, Some(SUPPORT_SQLITE_DATABASE));
    }

    #[test]
    fn test_add_class_merges_methods() {
        let mut catalog = TypeCatalog::android();
        catalog.add_class(
            ClassDef::new(SQLITE_DATABASE)
                .with_method(MethodDef::new("execSQL", &[TYPE_STRING], None))
                .with_method(MethodDef::new("beginTransaction", &[], None)),
        );
        let class = catalog.get_class(SQLITE_DATABASE).unwrap();
        assert_eq!(class.overloads("execSQL").count(), 2);
        assert_eq!(class.overloads("beginTransaction").count(), 1);
    }
}
