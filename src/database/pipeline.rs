//! Composable aggregation stages.
//!
//! Each builder method appends exactly one stage, so a pipeline reads in the
//! same order the database executes it. Joins name their direction explicitly
//! through [`Lookup`]: `local_field` lives on the documents flowing through the
//! pipeline, `foreign_field` on the `from` collection.

use mongodb::bson::{doc, Bson, Document};

use super::paging::{Page, Sort};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Document>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// `$match`
    pub fn match_on(mut self, filter: Document) -> Self {
        self.stages.push(doc! { "$match": filter });
        self
    }

    /// `$lookup`
    pub fn lookup(mut self, lookup: Lookup) -> Self {
        self.stages.push(lookup.into_stage());
        self
    }

    /// `$unwind` without preserving empty joins: rows whose join came back
    /// empty are dropped, which is what a mandatory one-to-one join wants.
    pub fn unwind(mut self, field: &str) -> Self {
        self.stages.push(doc! { "$unwind": format!("${}", field) });
        self
    }

    /// Collapse a joined array to its first element in place (`$first`).
    /// A missing join leaves the field absent instead of dropping the row.
    pub fn first(self, field: &str) -> Self {
        let mut fields = Document::new();
        fields.insert(field, doc! { "$first": format!("${}", field) });
        self.add_fields(fields)
    }

    /// `$addFields`
    pub fn add_fields(mut self, fields: Document) -> Self {
        self.stages.push(doc! { "$addFields": fields });
        self
    }

    /// `$project`
    pub fn project(mut self, projection: Projection) -> Self {
        self.stages.push(doc! { "$project": projection.into_document() });
        self
    }

    /// `$replaceRoot` with the embedded document at `field`
    pub fn replace_root(mut self, field: &str) -> Self {
        self.stages
            .push(doc! { "$replaceRoot": { "newRoot": format!("${}", field) } });
        self
    }

    /// `$sort`
    pub fn sort(self, sort: &Sort) -> Self {
        self.sort_by(sort.to_document())
    }

    pub fn sort_by(mut self, sort: Document) -> Self {
        self.stages.push(doc! { "$sort": sort });
        self
    }

    /// `$count` into a single document `{ field: n }`
    pub fn count(mut self, field: &str) -> Self {
        self.stages.push(doc! { "$count": field });
        self
    }

    /// `$skip` followed by `$limit`
    pub fn paginate(mut self, page: &Page) -> Self {
        self.stages.push(doc! { "$skip": page.offset() });
        self.stages.push(doc! { "$limit": page.size() });
        self
    }

    pub fn stages(&self) -> &[Document] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<Document> {
        self.stages
    }
}

impl From<Pipeline> for Vec<Document> {
    fn from(pipeline: Pipeline) -> Self {
        pipeline.into_stages()
    }
}

/// A `$lookup` join. Documents of `from` whose `foreign_field` equals the
/// current document's `local_field` are collected into `as_field`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
    pub pipeline: Option<Pipeline>,
}

impl Lookup {
    pub fn new(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        Self {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
            pipeline: None,
        }
    }

    /// Run `pipeline` on the joined documents before they are attached
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    fn into_stage(self) -> Document {
        let mut body = doc! {
            "from": self.from,
            "localField": self.local_field,
            "foreignField": self.foreign_field,
            "as": self.as_field,
        };
        if let Some(pipeline) = self.pipeline {
            body.insert("pipeline", pipeline.into_stages());
        }
        doc! { "$lookup": body }
    }
}

/// An inclusion projection. `_id` is kept unless [`Projection::without_id`]
/// is called.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    fields: Document,
}

impl Projection {
    pub fn include(fields: &[&str]) -> Self {
        let mut projection = Self::default();
        for field in fields {
            projection.fields.insert(*field, 1);
        }
        projection
    }

    /// Output `name` computed from an expression (e.g. `"$owner.username"`)
    pub fn computed(mut self, name: &str, expression: impl Into<Bson>) -> Self {
        self.fields.insert(name, expression.into());
        self
    }

    pub fn without_id(mut self) -> Self {
        self.fields.insert("_id", 0);
        self
    }

    pub fn into_document(self) -> Document {
        self.fields
    }
}

/// `{ $size: "$field" }`, for counts derived from a joined array
pub fn size_of(field: &str) -> Bson {
    Bson::Document(doc! { "$size": format!("${}", field) })
}

/// Set-membership flag: true when `value` appears in the array at `array_path`
/// (e.g. `"subscribers.subscriber"`). A missing array counts as empty.
pub fn contains(value: impl Into<Bson>, array_path: &str) -> Bson {
    let value: Bson = value.into();
    Bson::Document(doc! {
        "$cond": {
            "if": { "$in": [value, { "$ifNull": [format!("${}", array_path), []] }] },
            "then": true,
            "else": false
        }
    })
}
