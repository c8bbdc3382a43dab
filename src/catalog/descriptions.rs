//! Tool descriptions shown to the AI client.
//!
//! The single-diagram descriptions embed a syntax example so the model can
//! write valid diagram code without a separate lookup.

pub const CREATE_FILE: &str = "Create a new Eraser file with a document and/or diagram elements. \
The document field accepts markdown content and supports embedded diagram code blocks \
(e.g., ```flowchart-diagram) which are automatically converted to interactive canvas diagrams. \
Additionally supports standalone diagram elements via the elements array.";

pub const RENDER_PROMPT: &str = "Generate a diagram using AI from a natural language prompt, \
existing code, infrastructure configuration, or other diagram languages. Best for when you want \
AI to create the diagram code for you.";

pub const RENDER_ELEMENTS: &str = "Render multiple diagram elements. Advanced use case for \
rendering multiple diagrams at once.";

pub const LIST_FILES: &str = "List files in the workspace with pagination, sorting, and \
filtering. Returns file metadata (not content). Use getFile to retrieve file content.";

pub const GET_FILE: &str = "Get a single file. Includes metadata, markdown content, and diagram \
elements. Use this to read the current state of a file before making updates.";

pub const UPDATE_FILE: &str = "Update an existing file's metadata and / or document content";

pub const ARCHIVE_FILE: &str = "Archive (soft-delete) a file. The file can be restored from the \
trash in the Eraser UI. This does not permanently delete the file.";

pub const LIST_DIAGRAMS: &str = "List all diagrams in a file. Returns diagram metadata including \
type and code for each diagram element on the canvas.";

pub const CREATE_DIAGRAM: &str = "Create a new diagram in an existing file. The diagram is added \
to the file's canvas. Specify the diagram type and optionally provide initial code.";

pub const GET_DIAGRAM: &str = "Get a specific diagram from a file, including its type and code.";

pub const UPDATE_DIAGRAM: &str = "Update the code of an existing diagram in a file. Replaces the \
diagram's code with the new value.";

pub const DELETE_DIAGRAM: &str = "Permanently delete a diagram from a file. This removes the \
diagram element from the canvas. This action cannot be undone.";

pub const SEQUENCE_DIAGRAM: &str = r"Render a sequence diagram. Use Eraser's sequence diagram syntax.

Example syntax:
```
title Authentication Flow
autoNumber on

Client [icon: monitor, color: gray]
Server [icon: server, color: blue]
Service [icon: tool, color: green]

Client > Server: Data request
activate Server
Server <> Service: Service request

loop [label: until success, color: green] {
  Service > Service: Check availability
}

Server - Service: Data processing
Server --> Client: Data response
deactivate Server
```";

pub const ENTITY_RELATIONSHIP_DIAGRAM: &str = r"Render an entity-relationship diagram. Use Eraser's ERD syntax.

Example syntax:
```
title E-commerce Database

// Define tables with columns
users [icon: user, color: blue] {
  id int pk
  email string
  name string
  created_at timestamp
}

orders [icon: shopping-cart, color: green] {
  id int pk
  user_id int
  total decimal
  status string
  created_at timestamp
}

products [icon: box, color: orange] {
  id int pk
  name string
  price decimal
  stock int
}

order_items [icon: list] {
  order_id int pk
  product_id int pk
  quantity int
  price decimal
}

// Relationships
users.id < orders.user_id
orders.id < order_items.order_id
products.id < order_items.product_id
```";

pub const CLOUD_ARCHITECTURE_DIAGRAM: &str = r"Render a cloud architecture diagram. Use Eraser's cloud architecture syntax.

Example syntax:
```
title AWS Microservices Architecture

// Groups with cloud provider icons
AWS Cloud [icon: aws] {
  VPC [icon: aws-vpc] {
    Public Subnet {
      ALB [icon: aws-elb]
      NAT Gateway [icon: aws-nat-gateway]
    }
    Private Subnet {
      ECS Cluster [icon: aws-ecs] {
        API Service [icon: aws-lambda]
        Worker Service [icon: aws-lambda]
      }
      RDS [icon: aws-rds]
      ElastiCache [icon: aws-elasticache]
    }
  }
  S3 [icon: aws-s3]
  CloudFront [icon: aws-cloudfront]
}

Users [icon: users]

// Connections
Users > CloudFront
CloudFront > ALB
ALB > API Service
API Service > RDS
API Service > ElastiCache
Worker Service > S3
```";

pub const FLOWCHART: &str = r"Render a flowchart diagram. Use Eraser's flowchart syntax. Prefer horizontal layout (direction right) unless the user wants a vertical diagram.

Example syntax:
```
title User Registration Flow
direction right

// Nodes with shapes and icons
Start [shape: oval, icon: play]
Enter Details [icon: edit]
Valid Email? [shape: diamond, icon: help-circle]
Send Verification [icon: mail]
Email Verified? [shape: diamond]
Create Account [icon: user-plus, color: green]
Show Error [icon: alert-triangle, color: red]
End [shape: oval, icon: check]

// Groups
Validation [color: blue] {
  Check Password Strength [icon: lock]
  Password OK? [shape: diamond]
}

// Connections with labels
Start > Enter Details
Enter Details > Valid Email?
Valid Email? > Send Verification: Yes
Valid Email? > Show Error: No
Send Verification > Email Verified?
Email Verified? > Create Account: Yes
Email Verified? > Show Error: No
Create Account > End
Show Error > Enter Details
```";

pub const BPMN_DIAGRAM: &str = r"Render a BPMN (Business Process Model and Notation) diagram. Use Eraser's BPMN syntax.

Example syntax:
```
title Order Fulfillment Process

// Swimlanes (pools)
Customer [color: blue] {
  Place Order [type: event, icon: shopping-cart]
  Receive Confirmation [type: event, icon: mail]
  Receive Package [type: event, icon: package]
}

Sales [color: green] {
  Process Order [icon: clipboard]
  Check Inventory [icon: database]
  In Stock? [type: gateway, icon: help-circle]
  Create Backorder [icon: clock]
  Confirm Order [icon: check]
}

Warehouse [color: orange] {
  Pick Items [icon: box]
  Pack Order [icon: package]
  Ship Order [icon: truck]
}

// Flow connections (use --> for message flows between pools)
Place Order --> Process Order: Order details
Process Order > Check Inventory
Check Inventory > In Stock?
In Stock? > Confirm Order: Yes
In Stock? > Create Backorder: No
Confirm Order --> Receive Confirmation: Confirmation email
Confirm Order > Pick Items
Pick Items > Pack Order
Pack Order > Ship Order
Ship Order --> Receive Package: Delivery
```";
